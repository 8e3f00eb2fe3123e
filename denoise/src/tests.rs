use imaginarium::{ColorFormat, Image, ImageDesc};

use crate::testing::{Call, FailAt, RecordingEngine};
use crate::{
    denoise_image, denoise_image_file, DenoiseBridge, DenoiseConfig, Device, DeviceType, Error,
    Filter, ImageFormat, QualityTier, WeightsSource,
};

fn bridge() -> DenoiseBridge<RecordingEngine> {
    DenoiseBridge::new(RecordingEngine::new())
}

fn image_call(name: &str, width: usize, height: usize) -> Call {
    Call::SetSharedImage {
        name: name.to_string(),
        format: ImageFormat::Float3,
        width,
        height,
    }
}

#[test]
fn length_mismatch_acquires_nothing() {
    let bridge = bridge();

    for (width, height, len) in [(4, 4, 47), (4, 4, 49), (1, 1, 0), (3, 2, 6), (2, 3, 36)] {
        let mut pixels = vec![0.25f32; len];

        let result = bridge.try_denoise(
            &mut pixels,
            width,
            height,
            WeightsSource::EngineDefault,
            &DenoiseConfig::default(),
        );

        assert!(matches!(result, Err(Error::LengthMismatch { expected, actual, .. })
            if expected == width as usize * height as usize * 3 && actual == len));
        assert!(pixels.iter().all(|&v| v == 0.25));
    }

    assert_eq!(bridge.engine().counts().acquired(), 0);
    assert!(bridge.engine().calls().is_empty());
}

#[test]
fn zero_dimensions_are_rejected() {
    let bridge = bridge();
    let mut pixels: Vec<f32> = Vec::new();

    let result = bridge.try_denoise(
        &mut pixels,
        0,
        5,
        WeightsSource::EngineDefault,
        &DenoiseConfig::default(),
    );

    assert!(matches!(result, Err(Error::InvalidDimensions { width: 0, height: 5 })));
    assert!(bridge.engine().calls().is_empty());
}

#[test]
fn denoises_in_place() {
    let bridge = bridge();
    let mut pixels = vec![0.8f32; 4 * 4 * 3];
    let ptr = pixels.as_ptr();

    let result = bridge.denoise_buffer(
        &mut pixels,
        4,
        4,
        WeightsSource::EngineDefault,
        &DenoiseConfig::default(),
    );

    let denoised = result.unwrap();
    assert_eq!(denoised.len(), 48);
    assert_eq!(denoised.as_ptr(), ptr);
    assert!(denoised.iter().all(|&v| v == 0.4));

    assert!(bridge.engine().counts().is_balanced());
    assert!(bridge.engine().order_violations().is_empty());
}

#[test]
fn lifecycle_runs_in_order() {
    let bridge = bridge();
    let mut pixels = vec![0.5f32; 3 * 2 * 3];

    bridge
        .try_denoise(&mut pixels, 3, 2, WeightsSource::EngineDefault, &DenoiseConfig::default())
        .unwrap();

    assert_eq!(
        bridge.engine().calls(),
        vec![
            Call::NewDevice(DeviceType::Cpu),
            Call::CommitDevice,
            Call::NewFilter("RT".to_string()),
            image_call("color", 3, 2),
            image_call("output", 3, 2),
            Call::SetFilterBool("hdr".to_string(), false),
            Call::SetFilterBool("srgb".to_string(), false),
            Call::CommitFilter,
            Call::ExecuteFilter,
            Call::ReleaseFilter,
            Call::ReleaseDevice,
        ]
    );
}

#[test]
fn unavailable_weights_leave_buffer_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.tza");
    let empty = dir.path().join("empty.tza");
    std::fs::write(&empty, []).unwrap();

    let bridge = bridge();

    for path in [&missing, &empty] {
        let mut pixels: Vec<f32> = (0..12).map(|i| i as f32 / 12.0).collect();
        let original = pixels.clone();

        let result = bridge.denoise_buffer(
            &mut pixels,
            2,
            2,
            WeightsSource::File(path),
            &DenoiseConfig::default(),
        );

        assert!(result.is_none());
        assert_eq!(pixels, original);
    }

    let mut pixels = vec![0f32; 12];
    let result = bridge.try_denoise(
        &mut pixels,
        2,
        2,
        WeightsSource::File(&missing),
        &DenoiseConfig::default(),
    );
    assert!(matches!(result, Err(Error::WeightsUnavailable { path, .. }) if path == missing));
    assert_eq!(bridge.engine().counts().acquired(), 0);
}

#[test]
fn every_failure_releases_what_was_acquired() {
    let steps = [
        (FailAt::DeviceCreation, 0, 0),
        (FailAt::DeviceCommit, 1, 0),
        (FailAt::FilterCreation, 1, 0),
        (FailAt::FilterCommit, 1, 1),
        (FailAt::Execution, 1, 1),
        (FailAt::ExecutionPanic, 1, 1),
    ];

    for (step, devices, filters) in steps {
        let bridge = DenoiseBridge::new(RecordingEngine::failing_at(step));
        let mut pixels = vec![0.3f32; 2 * 2 * 3];

        let result = bridge.denoise_buffer(
            &mut pixels,
            2,
            2,
            WeightsSource::Bytes(vec![1, 2, 3]),
            &DenoiseConfig::default(),
        );
        assert!(result.is_none(), "{:?} should fail", step);

        let counts = bridge.engine().counts();
        assert!(counts.is_balanced(), "{:?}: {:?}", step, counts);
        assert_eq!(counts.devices_created, devices, "{:?}", step);
        assert_eq!(counts.filters_created, filters, "{:?}", step);
        assert!(bridge.engine().order_violations().is_empty(), "{:?}", step);
        assert!(pixels.iter().all(|&v| v == 0.3), "{:?} touched the buffer", step);

        let calls = bridge.engine().calls();
        let release_filter = calls.iter().position(|c| *c == Call::ReleaseFilter);
        let release_device = calls.iter().position(|c| *c == Call::ReleaseDevice);
        if let (Some(filter), Some(device)) = (release_filter, release_device) {
            assert!(filter < device, "{:?}: filter released after device", step);
        }
    }
}

#[test]
fn late_execution_fault_restores_the_buffer() {
    for step in [FailAt::Execution, FailAt::ExecutionPanic] {
        let bridge = DenoiseBridge::new(RecordingEngine::failing_at(step));
        let mut pixels = vec![0.8f32; 2 * 2 * 3];
        let ptr = pixels.as_ptr();

        let result = bridge.denoise_buffer(
            &mut pixels,
            2,
            2,
            WeightsSource::EngineDefault,
            &DenoiseConfig::default(),
        );

        assert!(result.is_none(), "{:?} should fail", step);
        assert!(bridge.engine().calls().contains(&Call::ExecuteFilter));
        assert!(bridge.engine().counts().is_balanced(), "{:?}", step);
        assert_eq!(pixels.as_ptr(), ptr);
        assert!(pixels.iter().all(|&v| v == 0.8), "{:?} left {:?}", step, pixels);
    }
}

#[test]
fn failure_reports_the_failing_step() {
    let cases = [
        FailAt::DeviceCreation,
        FailAt::DeviceCommit,
        FailAt::FilterCreation,
        FailAt::FilterCommit,
        FailAt::Execution,
    ];

    for step in cases {
        let bridge = DenoiseBridge::new(RecordingEngine::failing_at(step));
        let mut pixels = vec![0f32; 3];

        let err = bridge
            .try_denoise(&mut pixels, 1, 1, WeightsSource::EngineDefault, &DenoiseConfig::default())
            .unwrap_err();

        let matched = match step {
            FailAt::DeviceCreation => matches!(err, Error::DeviceCreation(DeviceType::Cpu)),
            FailAt::DeviceCommit => matches!(err, Error::DeviceCommit(_)),
            FailAt::FilterCreation => matches!(err, Error::FilterCreation(ref name) if name == "RT"),
            FailAt::FilterCommit => matches!(err, Error::FilterCommit(_)),
            FailAt::Execution => matches!(err, Error::Execution(_)),
            FailAt::ExecutionPanic => unreachable!(),
        };
        assert!(matched, "{:?} reported as {}", step, err);
    }
}

#[test]
fn unset_parameters_are_never_sent() {
    let bridge = bridge();
    let mut pixels = vec![0f32; 3];
    let config = DenoiseConfig {
        num_threads: 0,
        quality: 0,
        max_memory_mb: -1,
        input_scale: -2.0,
        ..Default::default()
    };

    bridge
        .try_denoise(&mut pixels, 1, 1, WeightsSource::EngineDefault, &config)
        .unwrap();

    let calls = bridge.engine().calls();
    assert!(!calls.iter().any(|c| matches!(c, Call::SetDeviceInt(..))));
    assert!(bridge.engine().filter_ints().is_empty());
    assert!(bridge.engine().filter_floats().is_empty());
}

#[test]
fn set_parameters_are_sent_verbatim() {
    let bridge = bridge();
    let mut pixels = vec![0f32; 3];
    let config = DenoiseConfig {
        num_threads: 3,
        max_memory_mb: 1024,
        input_scale: 0.125,
        hdr: true,
        srgb: true,
        device_type: DeviceType::Metal,
        ..Default::default()
    }
    .with_quality(QualityTier::High);

    bridge
        .try_denoise(&mut pixels, 1, 1, WeightsSource::EngineDefault, &config)
        .unwrap();

    let calls = bridge.engine().calls();
    assert_eq!(calls[0], Call::NewDevice(DeviceType::Metal));
    assert_eq!(calls[1], Call::SetDeviceInt("numThreads".to_string(), 3));
    assert_eq!(calls[2], Call::CommitDevice);
    assert!(calls.contains(&Call::SetFilterBool("hdr".to_string(), true)));
    assert!(calls.contains(&Call::SetFilterBool("srgb".to_string(), true)));
    assert_eq!(
        bridge.engine().filter_ints(),
        vec![("quality".to_string(), 6), ("maxMemoryMB".to_string(), 1024)]
    );
    assert_eq!(
        bridge.engine().filter_floats(),
        vec![("inputScale".to_string(), 0.125)]
    );
}

#[test]
fn weights_stay_valid_until_commit() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rt_hdr.tza");
    std::fs::write(&path, [9u8, 8, 7, 6, 5]).unwrap();

    let bridge = bridge();
    let mut pixels = vec![0f32; 3];

    bridge
        .try_denoise(&mut pixels, 1, 1, WeightsSource::File(&path), &DenoiseConfig::default())
        .unwrap();

    assert_eq!(bridge.engine().weights_at_commit(), Some(vec![9u8, 8, 7, 6, 5]));
    assert!(bridge.engine().calls().contains(&Call::SetSharedData {
        name: "weights".to_string(),
        byte_size: 5,
    }));
}

#[test]
fn empty_payload_uses_engine_weights() {
    let bridge = bridge();
    let mut pixels = vec![0f32; 3];

    bridge
        .try_denoise(&mut pixels, 1, 1, WeightsSource::Bytes(Vec::new()), &DenoiseConfig::default())
        .unwrap();

    assert!(!bridge
        .engine()
        .calls()
        .iter()
        .any(|c| matches!(c, Call::SetSharedData { .. })));
    assert_eq!(bridge.engine().weights_at_commit(), None);
}

#[test]
fn raw_buffer_is_denoised_in_place() {
    let bridge = bridge();
    let mut pixels = vec![1.0f32; 2 * 3 * 3];

    // SAFETY: `pixels` is live and not accessed during the call.
    let done = unsafe {
        bridge.denoise_raw(
            pixels.as_mut_ptr(),
            pixels.len(),
            2,
            3,
            WeightsSource::EngineDefault,
            &DenoiseConfig::default(),
        )
    };

    assert!(done);
    assert!(pixels.iter().all(|&v| v == 0.5));
}

#[test]
fn null_buffer_fails_before_any_resource() {
    let bridge = bridge();

    // SAFETY: a null pointer is rejected before any access.
    let result = unsafe {
        bridge.try_denoise_raw(
            std::ptr::null_mut(),
            12,
            2,
            2,
            WeightsSource::EngineDefault,
            &DenoiseConfig::default(),
        )
    };

    assert!(matches!(result, Err(Error::PinFailed)));
    assert_eq!(bridge.engine().counts().acquired(), 0);
}

#[test]
fn device_name_falls_back() {
    let none = bridge();
    assert_eq!(none.device_count(), 0);
    assert_eq!(none.device_name(), "none");

    let named = DenoiseBridge::new(RecordingEngine::new().with_physical_devices(&["Ryzen 9"]));
    assert_eq!(named.device_count(), 1);
    assert_eq!(named.device_name(), "Ryzen 9");

    let unnamed = DenoiseBridge::new(RecordingEngine::new().with_physical_devices(&[""]));
    assert_eq!(unnamed.device_name(), "CPU");
}

#[test]
fn failed_device_commit_releases_device() {
    let engine = RecordingEngine::failing_at(FailAt::DeviceCommit);

    let device = Device::new(&engine, DeviceType::Cpu).unwrap();
    assert!(matches!(device.commit(), Err(Error::DeviceCommit(_))));

    assert_eq!(engine.counts().devices_released, 1);
}

#[test]
fn filter_is_released_before_device() {
    let engine = RecordingEngine::new();
    let mut pixels = vec![0.2f32; 3];

    {
        let device = Device::new(&engine, DeviceType::Cpu).unwrap().commit().unwrap();
        let mut filter = Filter::new(&device, c"RT").unwrap();
        filter.bind_in_place(&mut pixels, 1, 1).unwrap();
        filter.commit().unwrap().execute().unwrap().release();
        device.release();
    }

    let calls = engine.calls();
    let n = calls.len();
    assert_eq!(calls[n - 2..], [Call::ReleaseFilter, Call::ReleaseDevice]);
    assert!(engine.order_violations().is_empty());
    assert_eq!(pixels, vec![0.1f32; 3]);
}

#[test]
fn bind_rejects_wrong_length() {
    let engine = RecordingEngine::new();
    let device = Device::new(&engine, DeviceType::Cpu).unwrap().commit().unwrap();
    let mut filter = Filter::new(&device, c"RT").unwrap();
    let mut pixels = vec![0f32; 5];

    let result = filter.bind_in_place(&mut pixels, 1, 2);

    assert!(matches!(result, Err(Error::LengthMismatch { expected: 6, actual: 5, .. })));
}

#[test]
fn image_is_denoised_and_keeps_alpha() {
    let bridge = bridge();
    let bytes = vec![
        200, 100, 50, 128, //
        10, 20, 30, 255, //
        0, 0, 0, 0, //
        255, 255, 255, 64,
    ];
    let image =
        Image::new_with_data(ImageDesc::new(2, 2, ColorFormat::RGBA_U8), bytes.clone()).unwrap();

    let denoised =
        denoise_image(&bridge, &image, WeightsSource::EngineDefault, &DenoiseConfig::default())
            .unwrap();

    assert_eq!(denoised.desc().color_format, ColorFormat::RGBA_U8);
    for (out, src) in denoised.bytes().chunks_exact(4).zip(bytes.chunks_exact(4)) {
        for c in 0..3 {
            let expected = src[c] as i32 / 2;
            assert!((out[c] as i32 - expected).abs() <= 1, "{:?} vs {:?}", out, src);
        }
        assert!((out[3] as i32 - src[3] as i32).abs() <= 1);
    }
}

#[test]
fn image_file_is_denoised() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("noisy.png");
    let output = dir.path().join("clean.png");

    let image =
        Image::new_with_data(ImageDesc::new(3, 2, ColorFormat::RGB_U8), vec![180; 18]).unwrap();
    image.save_file(&input).unwrap();

    let bridge = bridge();
    denoise_image_file(
        &bridge,
        &input,
        &output,
        WeightsSource::EngineDefault,
        &DenoiseConfig::default(),
    )
    .unwrap();

    let denoised = Image::read_file(&output).unwrap();
    assert_eq!((denoised.desc().width, denoised.desc().height), (3, 2));
    assert!(bridge.engine().counts().is_balanced());
}
