use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::bail;
use clap::Parser;
use inquire::error::InquireResult;
use tracing_subscriber::EnvFilter;

mod app;
mod cli;
mod config;
mod documents;
mod eid;
mod mcp;
mod semantic;
mod storage;
#[cfg(test)]
mod tests;
mod web;

use app::{AppFactory, MemoryService};
use documents::{parse_tags, DocumentCreate};

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // stdout belongs to the MCP channel
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();

    init_logging();

    let paths = AppFactory::get_paths(args.base_path)?;
    let config = AppFactory::create_config(&paths)?;
    let service = Arc::new(AppFactory::create_service(&paths, &config)?);

    match args.command {
        cli::Command::Mcp { web } => {
            if web {
                let service = service.clone();
                let listen = config.web.listen.clone();
                std::thread::spawn(move || {
                    if let Err(err) = web::start_daemon(service, &listen) {
                        log::error!("web dashboard stopped: {err:?}");
                    }
                });
            }

            mcp::McpServer::new(service).run_stdio()
        }

        cli::Command::Web { listen } => {
            let listen = listen.unwrap_or_else(|| config.web.listen.clone());
            web::start_daemon(service, &listen)
        }

        cli::Command::Add {
            content,
            tags,
            favorite,
            props,
        } => {
            let doc = service.add(DocumentCreate {
                content,
                tags: tags.as_deref().map(parse_tags).unwrap_or_default(),
                properties: props.into_iter().collect::<BTreeMap<_, _>>(),
                favorite,
            })?;
            print_json(&doc)
        }

        cli::Command::Search {
            query,
            limit,
            threshold,
        } => {
            let defaults = service.search_config();
            let results = service.search(
                &query,
                limit.unwrap_or(defaults.default_limit),
                threshold.unwrap_or(defaults.default_threshold),
            )?;

            let hits: Vec<_> = results
                .into_iter()
                .map(|result| {
                    serde_json::json!({
                        "document": result.document,
                        "score": result.score,
                        "boosted_score": result.boosted_score,
                    })
                })
                .collect();
            print_json(&hits)
        }

        cli::Command::List {} => print_json(&service.list()?),

        cli::Command::Get { id } => print_json(&service.get(&id)?),

        cli::Command::Favorite { id, off } => print_json(&service.set_favorite(&id, !off)?),

        cli::Command::Delete { id, yes } => delete(&service, &id, yes),

        cli::Command::Embed { text } => print_json(&service.embed(&text)),
    }
}

fn delete(service: &MemoryService, id: &str, yes: bool) -> anyhow::Result<()> {
    let doc = service.get(id)?;

    if !yes {
        match inquire::prompt_confirmation(format!(
            "Are you sure you want to delete memory {} ({} chars)?",
            doc.id,
            doc.content.chars().count()
        )) {
            InquireResult::Ok(true) => {}
            InquireResult::Ok(false) => return Ok(()),
            InquireResult::Err(err) => bail!("An error occurred: {}", err),
        }
    }

    service.delete(id)?;
    println!("Memory with ID {id} deleted successfully");
    Ok(())
}
