//! `sanders outputs`: List cross-stack outputs.

use clap::Args;
use sanders_common::config::PlatformConfig;
use sanders_platform::platform::synthesize;
use serde_json::{Map, Value, json};

use crate::output::{format_value, pad};

/// Arguments for the `outputs` command.
#[derive(Args, Debug)]
pub struct OutputsArgs {
    /// Print the outputs as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Executes the `outputs` command.
///
/// # Errors
///
/// Returns an error if synthesis fails.
pub fn execute(args: OutputsArgs, config: &PlatformConfig) -> anyhow::Result<()> {
    let stack = synthesize(config)?;
    let outputs = stack.template().outputs();

    if args.json {
        let rendered: Map<String, Value> = outputs
            .iter()
            .map(|(id, o)| {
                (
                    id.clone(),
                    json!({
                        "export": o.export_name,
                        "description": o.description,
                        "value": o.value.to_value(),
                    }),
                )
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&Value::Object(rendered))?);
        return Ok(());
    }

    let width = outputs.keys().map(String::len).max().unwrap_or(0);
    println!("OUTPUT\tEXPORT\tVALUE");
    for (id, output) in outputs {
        println!(
            "{}\t{}\t{}",
            pad(id, width),
            output.export_name,
            format_value(&output.value.to_value())
        );
    }
    Ok(())
}
