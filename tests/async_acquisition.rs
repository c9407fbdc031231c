// tests/async_acquisition.rs
//! Push-loop delivery against the simulated camera

use cam_core::hal::simulator::SimulatorConfig;
use cam_core::{
    CamError, CamResult, Camera, CameraState, DeviceDriver, ErrorKind, PluginRegistry, PropertyId,
    PropertyValue,
};
use crossbeam::channel;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn simulator(frame_period_ms: u64) -> SimulatorConfig {
    SimulatorConfig {
        sensor_width: 64,
        sensor_height: 64,
        bit_depth: 16,
        frame_period_ms,
        ..Default::default()
    }
}

fn open(config: SimulatorConfig) -> Camera {
    let mut registry = PluginRegistry::new();
    registry.register_simulator("sim", config);
    registry.open("sim").unwrap()
}

#[test]
fn test_consumer_sees_every_index_once_in_order() {
    let mut camera = open(simulator(5));
    let (tx, rx) = channel::unbounded();

    camera
        .register_callback(move |frame| {
            tx.send(frame.index()).unwrap();
        })
        .unwrap();
    camera.start_recording().unwrap();
    thread::sleep(Duration::from_millis(120));
    camera.stop_recording().unwrap();

    let indices: Vec<u64> = rx.try_iter().collect();
    assert!(indices.len() >= 5, "only {} frames delivered", indices.len());
    let expected: Vec<u64> = (0..indices.len() as u64).collect();
    assert_eq!(indices, expected);
}

#[test]
fn test_end_to_end_recording() {
    let mut camera = open(simulator(100));
    camera.set_property(PropertyId::Exposure, 5_000u32).unwrap();
    camera.set_property(PropertyId::Delay, 0u32).unwrap();
    camera.alloc_buffer(10).unwrap();

    let invocations = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&invocations);
    camera
        .register_callback(move |_frame| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    camera.start_recording().unwrap();
    assert_eq!(camera.state(), CameraState::ActiveAsync);
    thread::sleep(Duration::from_millis(950));
    camera.stop_recording().unwrap();
    assert_eq!(camera.state(), CameraState::Configurable);

    let count = invocations.load(Ordering::SeqCst);
    assert!((8..=11).contains(&count), "{} invocations", count);
    assert_eq!(camera.ring_buffer().written_count(), count.min(10));
}

#[test]
fn test_consumer_reads_frame_data() {
    let mut camera = open(simulator(5));
    let frame_size = camera.frame_size();
    let sizes = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&sizes);

    camera
        .register_callback(move |frame| {
            let data = frame.to_vec().unwrap();
            sink.lock().push((data.len(), frame.metadata().width));
        })
        .unwrap();
    camera.start_recording().unwrap();
    thread::sleep(Duration::from_millis(50));
    camera.stop_recording().unwrap();

    let sizes = sizes.lock();
    assert!(!sizes.is_empty());
    assert!(sizes.iter().all(|&(len, width)| len == frame_size && width == 64));
}

#[test]
fn test_consumer_survives_restart() {
    let mut camera = open(simulator(5));
    let invocations = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&invocations);
    camera
        .register_callback(move |_frame| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    camera.start_recording().unwrap();
    thread::sleep(Duration::from_millis(30));
    camera.stop_recording().unwrap();
    assert!(camera.has_callback());
    let first = invocations.load(Ordering::SeqCst);

    camera.start_recording().unwrap();
    assert_eq!(camera.state(), CameraState::ActiveAsync);
    thread::sleep(Duration::from_millis(30));
    camera.stop_recording().unwrap();
    assert!(invocations.load(Ordering::SeqCst) > first);

    // Without a consumer the next recording is synchronous
    camera.unregister_callback().unwrap();
    camera.start_recording().unwrap();
    assert_eq!(camera.state(), CameraState::ActiveSync);
    assert_eq!(camera.grab().unwrap().index(), 0);
    camera.stop_recording().unwrap();
}

#[test]
fn test_grab_rejected_in_async_mode() {
    let mut camera = open(simulator(5));
    camera.register_callback(|_frame| {}).unwrap();
    camera.start_recording().unwrap();

    let err = camera.grab().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StateError);

    camera.stop_recording().unwrap();
}

#[test]
fn test_panicking_consumer_is_unregistered() {
    let mut camera = open(simulator(5));
    camera
        .register_callback(|frame| {
            if frame.index() == 1 {
                panic!("consumer failure");
            }
        })
        .unwrap();

    camera.start_recording().unwrap();
    thread::sleep(Duration::from_millis(60));
    camera.stop_recording().unwrap();

    assert_eq!(camera.state(), CameraState::Configurable);
    assert!(!camera.has_callback());
}

/// Driver whose grab fails after a fixed number of frames
struct FlakyDriver {
    remaining: usize,
    stops: Arc<AtomicUsize>,
}

impl DeviceDriver for FlakyDriver {
    fn probe(&mut self) -> CamResult<()> {
        Ok(())
    }

    fn supports(&self, id: PropertyId) -> bool {
        matches!(id, PropertyId::Width | PropertyId::Height | PropertyId::BitDepth)
    }

    fn get_property(&mut self, id: PropertyId) -> CamResult<PropertyValue> {
        match id {
            PropertyId::Width | PropertyId::Height => Ok(8u32.into()),
            PropertyId::BitDepth => Ok(8u8.into()),
            other => Err(CamError::unsupported(other)),
        }
    }

    fn set_property(&mut self, id: PropertyId, _value: &PropertyValue) -> CamResult<()> {
        Err(CamError::read_only(id))
    }

    fn arm(&mut self) -> CamResult<()> {
        Ok(())
    }

    fn start(&mut self) -> CamResult<()> {
        Ok(())
    }

    fn stop(&mut self) -> CamResult<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn grab(&mut self, out: &mut [u8]) -> CamResult<()> {
        if self.remaining == 0 {
            return Err(CamError::GeneralDevice("link lost".to_string()));
        }
        self.remaining -= 1;
        thread::sleep(Duration::from_millis(2));
        out.fill(0x11);
        Ok(())
    }
}

#[test]
fn test_driver_error_reported_by_stop() {
    let stops = Arc::new(AtomicUsize::new(0));
    let driver_stops = Arc::clone(&stops);

    let mut registry = PluginRegistry::new();
    registry.register("flaky", move || {
        Ok(Box::new(FlakyDriver {
            remaining: 3,
            stops: Arc::clone(&driver_stops),
        }) as Box<dyn DeviceDriver>)
    });
    let mut camera = registry.open("flaky").unwrap();
    assert_eq!(camera.frame_size(), 64);

    let invocations = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&invocations);
    camera
        .register_callback(move |_frame| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    camera.start_recording().unwrap();
    thread::sleep(Duration::from_millis(50));

    let err = camera.stop_recording().unwrap_err();
    assert_eq!(err, CamError::GeneralDevice("link lost".to_string()));
    assert_eq!(camera.state(), CameraState::Configurable);
    assert_eq!(invocations.load(Ordering::SeqCst), 3);
    assert_eq!(stops.load(Ordering::SeqCst), 1);
    assert!(camera.has_callback());
}
