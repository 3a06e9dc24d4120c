use anyhow::{Context, Result};
use slipcast::event::Event;
use slipcast::rules::RuleEngine;
use std::io::Read;
use std::path::Path;

pub fn run(dir: &Path, file: &str, json: bool) -> Result<()> {
    let snapshot = super::load_snapshot(dir)?;

    let raw = if file == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read event from stdin")?;
        buf
    } else {
        std::fs::read_to_string(file).with_context(|| format!("Failed to read event file {}", file))?
    };
    let event: Event =
        serde_json::from_str(&raw).with_context(|| format!("Invalid event JSON in {}", file))?;

    let engine = RuleEngine::standard();
    let commands = engine.process_event(&event, &snapshot)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&commands)?);
    } else if commands.is_empty() {
        println!("Event {} produced no commands.", event.id);
    } else {
        println!("Event {} produced {} command(s):", event.id, commands.len());
        for cmd in &commands {
            println!(
                "  [{}] {:?} -> {}  ({})",
                cmd.command_id, cmd.command_type, cmd.target_object_id, cmd.reason
            );
        }
    }

    Ok(())
}
