//! Load a small fabric, route a few streams and print the packing and findings.
//!
//! Run with `RUST_LOG=dfg_engine=debug` to see each pass.

use dfg_engine::persist::{load_gaskets, save_streams};
use dfg_engine::{DfgModel, StreamDraft};
use tracing_subscriber::EnvFilter;

const FABRIC: &str = r#"[
    {"Name": "ADC", "InputBufferSize": 0, "OutputBufferSize": 256,
     "OutputStreams": [{"Index": 2}, {"Index": 3}, {"Index": 7}],
     "MinOutputStreamBufferSize": 32},
    {"Name": "CNN", "InputBufferSize": 512, "OutputBufferSize": 512,
     "InputStreams": [{"Index": 0}, {"Index": 1}],
     "OutputStreams": [{"Index": 20}, {"Index": 21}],
     "MinInputStreamBufferSize": 32, "MinOutputStreamBufferSize": 32,
     "InputAndOutputBuffersTied": true},
    {"Name": "DAC", "InputBufferSize": 192, "OutputBufferSize": 0,
     "InputStreams": [{"Index": 0, "BufferSize": 64}, {"Index": 1, "BufferSize": 128}]}
]"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let mut model = DfgModel::new(load_gaskets(FABRIC)?);

    model.create(
        StreamDraft::new("ADC", 64)
            .destination("DAC", 64)
            .description("Left")
            .source_config("SampleRate", serde_json::json!(48_000)),
    )?;
    let features = model.create(StreamDraft::new("ADC", 128).destination("CNN", 128).group("ml"))?;

    let linked = model
        .stream(features)
        .cloned()
        .ok_or("feature stream vanished")?;
    let mut labels = StreamDraft::new("CNN", 128)
        .destination("DAC", 128)
        .group("ml")
        .description("Labels");
    labels.link_tied(model.gaskets(), &linked)?;
    model.create(labels)?;

    // Oversized on purpose: the DAC only holds 192 bytes.
    model.create(StreamDraft::new("ADC", 64).destination("DAC", 64).description("Right"))?;

    println!("DFG packing");
    println!("===========");
    for (_, gasket) in model.gaskets().iter() {
        for stream in model.outbound(&gasket.name) {
            println!(
                "  {:>4} -> stream {:>3}  out[{}] @ {:>4} ({} bytes)",
                gasket.name,
                stream.stream_id,
                stream.source.index,
                stream.source.buffer_address,
                stream.source.buffer_size
            );
        }
        for stream in model.inbound(&gasket.name) {
            for destination in stream.destinations.iter().filter(|d| d.gasket == gasket.name) {
                println!(
                    "  {:>4} <- stream {:>3}   in[{}] @ {:>4} ({} bytes)",
                    gasket.name,
                    stream.stream_id,
                    destination.index,
                    destination.buffer_address,
                    destination.buffer_size
                );
            }
        }
    }

    println!();
    println!("Usage");
    for usage in model.usage() {
        println!(
            "  {:>4}: in {}/{}  out {}/{}",
            usage.name, usage.input_bytes, usage.input_capacity, usage.output_bytes, usage.output_capacity
        );
    }

    println!();
    if model.report().is_empty() {
        println!("No findings");
    } else {
        println!("Findings");
        for (id, errors) in &model.report().stream_errors {
            for error in errors {
                println!("  stream {id}: {}", error.message);
            }
        }
        for (name, errors) in &model.report().gasket_errors {
            for error in errors {
                println!("  gasket {name}: {}", error.message);
            }
        }
    }

    println!();
    println!("{}", save_streams(model.streams())?);
    Ok(())
}
