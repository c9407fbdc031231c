// demos/basic_usage.rs
//! Open the simulated camera, configure it and grab a few frames

use cam_core::{config::ConfigLoader, PluginRegistry, PropertyId};
use std::time::Instant;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    println!("cam-core Basic Usage Example");
    println!("============================");

    let mut config_loader = ConfigLoader::new();
    let config = config_loader.load_config()?;
    println!("Configuration loaded successfully");
    println!("  - Default block count: {}", config.acquisition.default_block_count);
    println!(
        "  - Simulated sensor: {}x{} @ {} bit",
        config.simulator.sensor_width, config.simulator.sensor_height, config.simulator.bit_depth
    );

    let registry = PluginRegistry::from_config(&config);
    let mut camera = registry.open("simulator")?;
    println!("\nCamera: {}", camera.name()?);

    camera.set_property(PropertyId::Width, 320u32)?;
    camera.set_property(PropertyId::Height, 240u32)?;
    camera.set_property(PropertyId::Exposure, 5_000u32)?;
    camera.alloc_buffer(8)?;
    println!("Frame size: {} bytes", camera.frame_size());

    camera.start_recording()?;
    let start = Instant::now();
    for _ in 0..5 {
        let frame = camera.grab()?;
        let data = frame.read()?;
        let mean = data
            .chunks_exact(2)
            .map(|px| u64::from(u16::from_le_bytes([px[0], px[1]])))
            .sum::<u64>()
            / (data.len() as u64 / 2);
        println!("Frame {} (slot {}): mean {}", frame.index(), frame.slot(), mean);
    }
    camera.stop_recording()?;

    println!("\nGrabbed 5 frames in {:?}", start.elapsed());
    camera.close()?;
    Ok(())
}
