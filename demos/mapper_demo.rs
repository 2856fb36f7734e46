//! Map a document through a spec and print the result.
//!
//! Run:
//!   cargo run --example mapper_demo
//!   cargo run --example mapper_demo -- document.json spec.json [options.json]
//!
//! Set `RUST_LOG=jsonmap_core=trace` to see resolution misses.

use std::env;
use std::fs;

use jsonmap_core::compiler::compile;
use jsonmap_core::{Evaluator, JValue, MapperOptions};

const SAMPLE_DOCUMENT: &str = r##"{
    "id": "69cbfdd6",
    "type": "apartment",
    "description": {"en": "Apartment with pool", "nl": "Appartement met zwembad"},
    "documents": [
        {"id": "d1", "description": "floor plan"},
        {"id": "d2", "description": "certificate"}
    ],
    "images": [{"id": "i1", "description": "front"}],
    "features": {"energy": {"gas": true}}
}"##;

const SAMPLE_SPEC: &str = r##"{
    "reference": "id",
    "text": {"en": "description.en", "de": "description.de"},
    "source": "#demo",
    "attachments.*": [
        {"id": "documents.*.id", "label": "documents.*.description", "kind": "#document"},
        {"id": "images.*.id", "label": "images.*.description", "kind": "#image"}
    ]
}"##;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let (document, spec) = match args.as_slice() {
        [] => (SAMPLE_DOCUMENT.to_string(), SAMPLE_SPEC.to_string()),
        [document, spec, ..] => (fs::read_to_string(document)?, fs::read_to_string(spec)?),
        _ => return Err("usage: mapper_demo [document.json spec.json [options.json]]".into()),
    };
    let options = match args.get(2) {
        Some(path) => MapperOptions::from_json_str(&fs::read_to_string(path)?)?,
        None => MapperOptions::default(),
    };

    let document = JValue::from_json_str(&document)?;
    let spec = JValue::from_json_str(&spec)?;

    let mapping = compile(&spec, &options)?;
    println!("{} distinct paths, depth {}", mapping.path_count(), mapping.depth());

    let result = Evaluator::with_options(options).evaluate(&mapping, &document)?;

    match result {
        Some(value) => println!("{}", value.to_json_string_pretty()?),
        None => println!("null"),
    }
    Ok(())
}
