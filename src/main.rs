use {
  anyhow::{Context, ensure},
  chrono::{DateTime, Utc},
  clap::Parser,
  client::{Client, ItemSource},
  command::Command,
  comment::{Comment, Traversed},
  config::Config,
  crossterm::style::Stylize,
  dispatcher::Dispatcher,
  error::Error,
  futures::{
    future::join_all,
    stream::{self, StreamExt},
  },
  item::Item,
  kind::Kind,
  memory_store::MemoryStore,
  persister::{BatchSettings, Persister},
  queue::{Queue, Topic},
  record::Record,
  resolver::Resolver,
  serde::{Deserialize, Serialize},
  shell::Shell,
  sqlite_store::SqliteStore,
  std::{
    backtrace::BacktraceStatus,
    collections::{BTreeMap, HashMap, HashSet, VecDeque},
    fmt::{self, Debug, Display, Formatter},
    io::{self, IsTerminal, Write},
    ops::ControlFlow,
    process, slice,
    str::FromStr,
    sync::{
      Arc, Mutex, MutexGuard, PoisonError,
      atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Duration,
  },
  store::{CommentWithAncestors, Document, Store, StoryWithDescendants},
  story::{Story, StoryTitle},
  story_tree::StoryTree,
  tokio::{
    io::{AsyncBufReadExt, BufReader},
    pin,
    sync::{Notify, RwLock},
    task::JoinHandle,
    time::{self, Instant},
  },
  tracing::{debug, error, info, warn},
  tracing_subscriber::EnvFilter,
};

mod client;
mod command;
mod comment;
mod config;
mod dispatcher;
mod error;
mod item;
mod kind;
mod memory_store;
mod persister;
mod queue;
mod record;
mod resolver;
mod shell;
mod sqlite_store;
mod store;
mod story;
mod story_tree;

type Result<T = (), E = anyhow::Error> = std::result::Result<T, E>;

fn initialize_tracing() {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info")),
    )
    .with_writer(io::stderr)
    .init();
}

async fn run() -> Result {
  let config = Config::parse();

  config.validate().context("invalid configuration")?;

  initialize_tracing();

  let client = Client::new(&config.base_url, config.request_timeout())?;

  if config.database == Config::MEMORY_DATABASE {
    serve(&config, client, MemoryStore::default()).await
  } else {
    let store = SqliteStore::connect(&config.database)
      .await
      .with_context(|| format!("could not open database `{}`", config.database))?;

    serve(&config, client, store).await
  }
}

async fn serve<S: Store>(config: &Config, client: Client, store: S) -> Result {
  let queue = Queue::default();

  let settings = config.batch_settings();

  let mut consumers =
    Persister::<Story, S>::spawn(&queue.stories, &store, settings);

  consumers.extend(Persister::<Comment, S>::spawn(
    &queue.comments,
    &store,
    settings,
  ));

  info!(
    start_id = config.start_id,
    retrieve_count = config.retrieve_count,
    workers = config.workers(),
    "ready"
  );

  let result = Shell::new(config, client, store, queue.clone()).run().await;

  queue.close();

  for joined in join_all(consumers).await {
    if let Err(error) = joined {
      error!(%error, "consumer task failed");
    }
  }

  result
}

#[tokio::main]
async fn main() {
  if let Err(error) = run().await {
    let use_color = io::stderr().is_terminal();

    if use_color {
      eprintln!("{} {error}", "error:".bold().red());
    } else {
      eprintln!("error: {error}");
    }

    for (i, error) in error.chain().skip(1).enumerate() {
      if i == 0 {
        eprintln!();

        if use_color {
          eprintln!("{}", "because:".bold().red());
        } else {
          eprintln!("because:");
        }
      }

      if use_color {
        eprintln!("{} {error}", "-".bold().red());
      } else {
        eprintln!("- {error}");
      }
    }

    let backtrace = error.backtrace();

    if backtrace.status() == BacktraceStatus::Captured {
      if use_color {
        eprintln!("{}", "backtrace:".bold().red());
      } else {
        eprintln!("backtrace:");
      }

      eprintln!("{backtrace}");
    }

    process::exit(1);
  }
}
