use std::fmt;

/// Channel layout of a pixel, in storage order.
#[derive(Debug, Hash, PartialEq, Eq, Copy, Clone)]
#[repr(u8)]
pub enum Channels {
    L = 1,
    LA = 2,
    Rgb = 3,
    Rgba = 4,
}

impl Channels {
    pub fn count(self) -> usize {
        self as usize
    }

    pub fn has_alpha(self) -> bool {
        matches!(self, Channels::LA | Channels::Rgba)
    }

    pub fn has_color(self) -> bool {
        matches!(self, Channels::Rgb | Channels::Rgba)
    }
}

/// Storage type of one channel sample. Integer samples use the full range of
/// the type, float samples are nominally in `[0, 1]`.
#[derive(Debug, Hash, PartialEq, Eq, Copy, Clone)]
pub enum SampleType {
    U8,
    U16,
    F32,
}

impl SampleType {
    pub fn byte_count(self) -> usize {
        match self {
            SampleType::U8 => 1,
            SampleType::U16 => 2,
            SampleType::F32 => 4,
        }
    }
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct ColorFormat {
    pub channels: Channels,
    pub sample: SampleType,
}

impl ColorFormat {
    pub const fn new(channels: Channels, sample: SampleType) -> Self {
        ColorFormat { channels, sample }
    }

    pub fn pixel_bytes(&self) -> usize {
        self.channels.count() * self.sample.byte_count()
    }
}

macro_rules! define_color_formats {
    ($(($prefix:ident, $channels:ident)),+ $(,)?) => {
        paste::paste! {
            impl ColorFormat {
                $(
                    pub const [<$prefix _U8>]: ColorFormat = ColorFormat::new(Channels::$channels, SampleType::U8);
                    pub const [<$prefix _U16>]: ColorFormat = ColorFormat::new(Channels::$channels, SampleType::U16);
                    pub const [<$prefix _F32>]: ColorFormat = ColorFormat::new(Channels::$channels, SampleType::F32);
                )+
            }
        }
    };
}

define_color_formats!((L, L), (LA, LA), (RGB, Rgb), (RGBA, Rgba));

impl fmt::Display for Channels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channels::L => write!(f, "L"),
            Channels::LA => write!(f, "LA"),
            Channels::Rgb => write!(f, "RGB"),
            Channels::Rgba => write!(f, "RGBA"),
        }
    }
}

impl fmt::Display for SampleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleType::U8 => write!(f, "u8"),
            SampleType::U16 => write!(f, "u16"),
            SampleType::F32 => write!(f, "f32"),
        }
    }
}

impl fmt::Display for ColorFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.channels, self.sample)
    }
}
