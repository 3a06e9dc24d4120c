use anyhow::Result;
use serde::Serialize;
use slipcast::rules::{RuleEngine, RuleInfo};

#[derive(Debug, Serialize)]
struct RulesOutput {
    status: &'static str,
    rules_loaded: usize,
    rules: Vec<RuleInfo>,
}

pub fn run(json: bool) -> Result<()> {
    let engine = RuleEngine::standard();
    let registry = engine.registry();

    if json {
        let output = RulesOutput {
            status: "ok",
            rules_loaded: engine.rules_loaded(),
            rules: registry,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{} rule(s) loaded:", engine.rules_loaded());
        for info in &registry {
            let events: Vec<String> = info
                .event_types
                .iter()
                .map(|t| format!("{:?}", t))
                .collect();
            println!("  {}. {} [{}]", info.order + 1, info.name, events.join(", "));
        }
    }

    Ok(())
}
