//! Recording fake of [`DenoiseEngine`] for test suites.
//!
//! Counts every device and filter creation and release, records every call in
//! order, flags calls made out of lifecycle order and can fail any step on
//! demand. Executing a filter halves every sample of the bound output image.

use std::collections::HashMap;
use std::ffi::CStr;

use parking_lot::Mutex;

use crate::engine::{DenoiseEngine, DeviceType, EngineFault, ImageFormat};

pub const FAULT_CODE: i32 = 1;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    NewDevice(DeviceType),
    SetDeviceInt(String, i32),
    CommitDevice,
    ReleaseDevice,
    NewFilter(String),
    SetSharedData {
        name: String,
        byte_size: usize,
    },
    SetSharedImage {
        name: String,
        format: ImageFormat,
        width: usize,
        height: usize,
    },
    SetFilterBool(String, bool),
    SetFilterInt(String, i32),
    SetFilterFloat(String, f32),
    CommitFilter,
    ExecuteFilter,
    ReleaseFilter,
}

/// Step the engine fails at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    DeviceCreation,
    DeviceCommit,
    FilterCreation,
    FilterCommit,
    Execution,
    /// Panics inside filter execution.
    ExecutionPanic,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceCounts {
    pub devices_created: usize,
    pub devices_released: usize,
    pub filters_created: usize,
    pub filters_released: usize,
}

impl ResourceCounts {
    pub fn is_balanced(&self) -> bool {
        self.devices_created == self.devices_released
            && self.filters_created == self.filters_released
    }

    pub fn acquired(&self) -> usize {
        self.devices_created + self.filters_created
    }
}

#[derive(Debug)]
pub struct FakeDevice(u32);

#[derive(Debug)]
pub struct FakeFilter(u32);

#[derive(Debug, Default)]
struct DeviceState {
    committed: bool,
    live_filters: usize,
    error: Option<EngineFault>,
}

#[derive(Debug, Default)]
struct FilterState {
    device: u32,
    committed: bool,
    // Addresses are kept as integers so the engine stays Send + Sync.
    weights: Option<(usize, usize)>,
    output: Option<(usize, usize)>,
}

#[derive(Debug, Default)]
struct State {
    next_id: u32,
    calls: Vec<Call>,
    counts: ResourceCounts,
    devices: HashMap<u32, DeviceState>,
    filters: HashMap<u32, FilterState>,
    violations: Vec<String>,
    weights_at_commit: Option<Vec<u8>>,
}

impl State {
    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn violation(&mut self, message: impl Into<String>) {
        self.violations.push(message.into());
    }

    fn fail(&mut self, device: u32, what: &str) {
        if let Some(state) = self.devices.get_mut(&device) {
            state.error = Some(EngineFault {
                code: FAULT_CODE,
                message: format!("injected {} failure", what),
            });
        }
    }
}

#[derive(Debug, Default)]
pub struct RecordingEngine {
    fail_at: Option<FailAt>,
    physical_devices: Vec<String>,
    state: Mutex<State>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_at(step: FailAt) -> Self {
        Self {
            fail_at: Some(step),
            ..Default::default()
        }
    }

    pub fn with_physical_devices(mut self, names: &[&str]) -> Self {
        self.physical_devices = names.iter().map(|name| name.to_string()).collect();
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn counts(&self) -> ResourceCounts {
        self.state.lock().counts
    }

    pub fn order_violations(&self) -> Vec<String> {
        self.state.lock().violations.clone()
    }

    /// Weights as the engine could read them when the filter was committed.
    pub fn weights_at_commit(&self) -> Option<Vec<u8>> {
        self.state.lock().weights_at_commit.clone()
    }

    pub fn filter_ints(&self) -> Vec<(String, i32)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::SetFilterInt(name, value) => Some((name, value)),
                _ => None,
            })
            .collect()
    }

    pub fn filter_floats(&self) -> Vec<(String, f32)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::SetFilterFloat(name, value) => Some((name, value)),
                _ => None,
            })
            .collect()
    }

    fn fails_at(&self, step: FailAt) -> bool {
        self.fail_at == Some(step)
    }
}

fn name(name: &CStr) -> String {
    name.to_string_lossy().into_owned()
}

impl DenoiseEngine for RecordingEngine {
    type Device = FakeDevice;
    type Filter = FakeFilter;

    fn physical_device_count(&self) -> i32 {
        self.physical_devices.len() as i32
    }

    fn physical_device_string(&self, index: i32, query: &CStr) -> Option<String> {
        if query.to_bytes() != b"name" {
            return None;
        }
        usize::try_from(index)
            .ok()
            .and_then(|index| self.physical_devices.get(index).cloned())
    }

    fn new_device(&self, device_type: DeviceType) -> Option<FakeDevice> {
        let mut state = self.state.lock();
        state.calls.push(Call::NewDevice(device_type));

        if self.fails_at(FailAt::DeviceCreation) {
            return None;
        }

        let id = state.next_id();
        state.devices.insert(id, DeviceState::default());
        state.counts.devices_created += 1;

        Some(FakeDevice(id))
    }

    fn set_device_int(&self, device: &FakeDevice, key: &CStr, value: i32) {
        let mut state = self.state.lock();
        state.calls.push(Call::SetDeviceInt(name(key), value));

        if state.devices.get(&device.0).is_some_and(|d| d.committed) {
            state.violation("device parameter set after commit");
        }
    }

    fn commit_device(&self, device: &FakeDevice) {
        let mut state = self.state.lock();
        state.calls.push(Call::CommitDevice);

        if self.fails_at(FailAt::DeviceCommit) {
            state.fail(device.0, "device commit");
            return;
        }
        if let Some(device) = state.devices.get_mut(&device.0) {
            device.committed = true;
        }
    }

    fn take_device_error(&self, device: &FakeDevice) -> Option<EngineFault> {
        self.state
            .lock()
            .devices
            .get_mut(&device.0)
            .and_then(|device| device.error.take())
    }

    fn release_device(&self, device: FakeDevice) {
        let mut state = self.state.lock();
        state.calls.push(Call::ReleaseDevice);

        match state.devices.remove(&device.0) {
            Some(released) if released.live_filters > 0 => {
                state.violation("device released while filters are alive");
            }
            Some(_) => {}
            None => state.violation("unknown device released"),
        }
        state.counts.devices_released += 1;
    }

    fn new_filter(&self, device: &FakeDevice, filter_type: &CStr) -> Option<FakeFilter> {
        let mut state = self.state.lock();
        state.calls.push(Call::NewFilter(name(filter_type)));

        if !state.devices.get(&device.0).is_some_and(|d| d.committed) {
            state.violation("filter created on an uncommitted device");
        }
        if self.fails_at(FailAt::FilterCreation) {
            return None;
        }

        let id = state.next_id();
        state.filters.insert(
            id,
            FilterState {
                device: device.0,
                ..Default::default()
            },
        );
        if let Some(device) = state.devices.get_mut(&device.0) {
            device.live_filters += 1;
        }
        state.counts.filters_created += 1;

        Some(FakeFilter(id))
    }

    unsafe fn set_shared_filter_data(
        &self,
        filter: &FakeFilter,
        key: &CStr,
        data: *mut u8,
        byte_size: usize,
    ) {
        let mut state = self.state.lock();
        state.calls.push(Call::SetSharedData {
            name: name(key),
            byte_size,
        });

        if let Some(filter) = state.filters.get_mut(&filter.0) {
            filter.weights = Some((data as usize, byte_size));
        }
    }

    unsafe fn set_shared_filter_image(
        &self,
        filter: &FakeFilter,
        key: &CStr,
        data: *mut f32,
        format: ImageFormat,
        width: usize,
        height: usize,
    ) {
        let mut state = self.state.lock();
        let key = name(key);
        state.calls.push(Call::SetSharedImage {
            name: key.clone(),
            format,
            width,
            height,
        });

        if key == "output" {
            let len = width * height * format.channel_count();
            if let Some(filter) = state.filters.get_mut(&filter.0) {
                filter.output = Some((data as usize, len));
            }
        }
    }

    fn set_filter_bool(&self, filter: &FakeFilter, key: &CStr, value: bool) {
        let mut state = self.state.lock();
        state.calls.push(Call::SetFilterBool(name(key), value));
        if state.filters.get(&filter.0).is_some_and(|f| f.committed) {
            state.violation("filter parameter set after commit");
        }
    }

    fn set_filter_int(&self, filter: &FakeFilter, key: &CStr, value: i32) {
        let mut state = self.state.lock();
        state.calls.push(Call::SetFilterInt(name(key), value));
        if state.filters.get(&filter.0).is_some_and(|f| f.committed) {
            state.violation("filter parameter set after commit");
        }
    }

    fn set_filter_float(&self, filter: &FakeFilter, key: &CStr, value: f32) {
        let mut state = self.state.lock();
        state.calls.push(Call::SetFilterFloat(name(key), value));
        if state.filters.get(&filter.0).is_some_and(|f| f.committed) {
            state.violation("filter parameter set after commit");
        }
    }

    fn commit_filter(&self, filter: &FakeFilter) {
        let mut state = self.state.lock();
        state.calls.push(Call::CommitFilter);

        let Some(current) = state.filters.get_mut(&filter.0) else {
            state.violation("unknown filter committed");
            return;
        };
        let device = current.device;
        let weights = current.weights;

        if self.fails_at(FailAt::FilterCommit) {
            state.fail(device, "filter commit");
            return;
        }
        current.committed = true;

        // SAFETY: shared data must stay valid until commit returns.
        state.weights_at_commit = weights
            .map(|(ptr, len)| unsafe { std::slice::from_raw_parts(ptr as *const u8, len) }.to_vec());
    }

    fn execute_filter(&self, filter: &FakeFilter) {
        let mut state = self.state.lock();
        state.calls.push(Call::ExecuteFilter);

        let Some(current) = state.filters.get(&filter.0) else {
            state.violation("unknown filter executed");
            return;
        };
        let (device, committed, output) = (current.device, current.committed, current.output);

        if !committed {
            state.violation("filter executed before commit");
        }

        // Failing modes write the output first, like an engine that faults late.
        if let Some((ptr, len)) = output {
            // SAFETY: the output image stays bound and valid until release.
            let pixels = unsafe { std::slice::from_raw_parts_mut(ptr as *mut f32, len) };
            pixels.iter_mut().for_each(|v| *v *= 0.5);
        }

        if self.fails_at(FailAt::Execution) {
            state.fail(device, "execution");
            return;
        }
        if self.fails_at(FailAt::ExecutionPanic) {
            drop(state);
            panic!("injected execution panic");
        }
    }

    fn release_filter(&self, filter: FakeFilter) {
        let mut state = self.state.lock();
        state.calls.push(Call::ReleaseFilter);

        match state.filters.remove(&filter.0) {
            Some(released) => {
                match state.devices.get_mut(&released.device) {
                    Some(device) => device.live_filters -= 1,
                    None => state.violation("filter released after its device"),
                }
            }
            None => state.violation("unknown filter released"),
        }
        state.counts.filters_released += 1;
    }
}
