use std::process::ExitCode;

use clap::Parser;
use itertools::Itertools;
use ksu_status::{FixtureAccessor, KsuAccessor, KsuStatusGraph, ProcfsAccessor, RawUpdate, SignalName, StatusView};
use strum::IntoEnumIterator;
use tracing::{debug, info};

use crate::opts::{Command, Format, Opts};

mod logging;
mod opts;

fn main() -> anyhow::Result<ExitCode> {
    let args = argfile::expand_args(argfile::parse_fromfile, argfile::PREFIX)?;

    let opts = Opts::parse_from(args);

    logging::configure_tracing(opts.trace.clone(), opts.verbose.clone())?;

    let accessor: Box<dyn KsuAccessor> = match &opts.fixture {
        Some(path) => Box::new(FixtureAccessor::load(path)?),
        None => Box::new(ProcfsAccessor::new(&opts.proc_root, opts.minimal_supported_version)),
    };

    let graph = KsuStatusGraph::new(accessor.as_ref());

    match opts.command {
        Command::Show {
            format,
            signals,
        } => show(&graph.view(), format, &selected(signals))?,
        Command::Watch {
            signals,
            updates,
            atomic,
        } => watch(&graph, &selected(signals), updates, atomic),
        Command::Check => return Ok(check(&graph.view())),
    }

    Ok(ExitCode::SUCCESS)
}

/// All signals, in declaration order, when none are given.
fn selected(signals: Vec<SignalName>) -> Vec<SignalName> {
    if signals.is_empty() { SignalName::iter().collect() } else { signals }
}

fn show(view: &StatusView, format: Format, signals: &[SignalName]) -> anyhow::Result<()> {
    match format {
        Format::Text => {
            let lines = signals
                .iter()
                .map(|name| format!("{}: {}", name, view.current(*name)))
                .join("\n");
            println!("{}", lines);
        }
        Format::Json => {
            let object = signals
                .iter()
                .map(|name| serde_json::to_value(view.current(*name)).map(|value| (name.to_string(), value)))
                .collect::<Result<serde_json::Map<String, serde_json::Value>, _>>()?;
            println!("{}", serde_json::to_string_pretty(&object)?);
        }
    }

    Ok(())
}

fn watch(graph: &KsuStatusGraph, signals: &[SignalName], updates: Vec<RawUpdate>, atomic: bool) {
    let view = graph.view();

    let _subscriptions = signals
        .iter()
        .map(|name| {
            let name = *name;
            view.subscribe(name, move |value| println!("{}: {}", name, value))
        })
        .collect::<Vec<_>>();

    let changed = if atomic {
        graph.apply(updates)
    } else {
        updates
            .into_iter()
            .inspect(|update| debug!("Applying update. update: {:?}", update))
            .filter(|update| graph.update(*update))
            .count()
    };

    info!("Watch complete. changed: {}", changed);
}

fn check(view: &StatusView) -> ExitCode {
    match view.ksu_version().get() {
        Some(version) => {
            println!("{}: {}", SignalName::KsuVersion, version);
            ExitCode::SUCCESS
        }
        None => {
            println!("KernelSU is not available to this process");
            ExitCode::FAILURE
        }
    }
}
