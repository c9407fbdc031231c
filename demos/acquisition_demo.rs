// demos/acquisition_demo.rs
//! Record asynchronously into a consumer closure

use cam_core::{PluginRegistry, PropertyId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    println!("cam-core Asynchronous Acquisition Demo");
    println!("======================================");

    let registry = PluginRegistry::with_builtins();
    let mut camera = registry.open("simulator")?;
    camera.set_property(PropertyId::Exposure, 2_000u32)?;
    camera.alloc_buffer(16)?;

    let frames = Arc::new(AtomicU64::new(0));
    let bytes = Arc::new(AtomicU64::new(0));
    let (frame_counter, byte_counter) = (Arc::clone(&frames), Arc::clone(&bytes));

    camera.register_callback(move |frame| {
        match frame.read() {
            Ok(data) => {
                byte_counter.fetch_add(data.len() as u64, Ordering::Relaxed);
            }
            Err(e) => eprintln!("frame {} lost: {}", frame.index(), e),
        }
        frame_counter.fetch_add(1, Ordering::Relaxed);
    })?;

    camera.start_recording()?;
    for second in 1..=3 {
        std::thread::sleep(Duration::from_secs(1));
        println!(
            "t={}s: {} frames, {:.1} MiB",
            second,
            frames.load(Ordering::Relaxed),
            bytes.load(Ordering::Relaxed) as f64 / (1024.0 * 1024.0)
        );
    }
    camera.stop_recording()?;

    let buffer = camera.ring_buffer();
    println!(
        "\nRing buffer: {} of {} slots written, cursor at {}",
        buffer.written_count(),
        buffer.block_count(),
        buffer.write_cursor()
    );

    camera.close()?;
    Ok(())
}
