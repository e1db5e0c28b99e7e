//! Read a packet, show every property the way an editor would, change a
//! few values and write the packet back after a caller tag.
//!
//! ```text
//! cargo run --example edit_packet -- input.xmp [output.xmp]
//! ```

use std::env;
use std::fs;
use std::process::ExitCode;
use xmpmodel::{ParseOptions, XmpEncoder, XmpParser, XmpResult};

const TAG: &[u8] = b"GIMP_XMP_1";

fn run(input: &str, output: Option<&str>) -> XmpResult<()> {
    let parsed = XmpParser::new()
        .options(ParseOptions::lenient())
        .parse_file(input)?;
    for warning in &parsed.warnings {
        println!("warning: {}", warning);
    }

    let mut store = parsed.store;
    for (key, value) in store.iter() {
        println!(
            "{:<28} {:<22} {}",
            key.to_string(),
            value.shape().to_string(),
            value
        );
    }

    store.set_scalar("xmp", "CreatorTool", "edit_packet")?;
    store.append_item("dc", "subject", "edited")?;

    let mut buffer = TAG.to_vec();
    XmpEncoder::new().encode_into(&store, &mut buffer)?;

    match output {
        Some(path) => fs::write(path, &buffer)?,
        None => println!("{}", String::from_utf8_lossy(&buffer)),
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let Some(input) = args.get(1) else {
        eprintln!("usage: {} <input.xmp> [output.xmp]", args[0]);
        return ExitCode::FAILURE;
    };

    match run(input, args.get(2).map(String::as_str)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
