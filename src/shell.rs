use super::*;

const PROMPT: &str = "Type your command > ";

#[derive(Debug)]
pub(crate) struct Shell<C, S> {
  dispatcher: Dispatcher<C>,
  queue: Queue,
  resolver: Resolver<S>,
  retrieve_count: u64,
  start_id: i64,
  store: S,
}

impl<C: ItemSource, S: Store> Shell<C, S> {
  pub(crate) async fn execute(
    &self,
    command: Command,
    out: &mut impl Write,
  ) -> Result<ControlFlow<()>> {
    match command {
      Command::Consume => {
        match self
          .dispatcher
          .try_run(self.start_id, self.retrieve_count)
          .await
        {
          Some(stats) => writeln!(
            out,
            "Consumed {} of {} items in {} ms",
            stats.dispatched,
            stats.scheduled,
            stats.elapsed.as_millis()
          )?,
          None => writeln!(out, "Items were already consumed.")?,
        }
      }
      Command::Exit => {
        self.queue.purge();
        return Ok(ControlFlow::Break(()));
      }
      Command::List => {
        let titles = self
          .store
          .story_titles()
          .await
          .context("could not list stories")?;

        if titles.is_empty() {
          writeln!(out, "There are no entries to show.")?;
        } else {
          writeln!(out, "Showing {} entries:", titles.len())?;

          for title in titles {
            writeln!(
              out,
              "{} {}",
              title.external_id,
              title.title.as_deref().unwrap_or_default()
            )?;
          }
        }
      }
      Command::Show(external_id) => {
        match self
          .resolver
          .resolve(external_id)
          .await
          .with_context(|| format!("could not resolve {external_id}"))?
        {
          Some(tree) => writeln!(out, "{}", serde_json::to_string(&tree)?)?,
          None => {
            writeln!(out, "Unable to find entity with id: {external_id}")?;
          }
        }
      }
      Command::Unknown => writeln!(out, "{}", Command::USAGE)?,
    }

    Ok(ControlFlow::Continue(()))
  }

  pub(crate) fn new(config: &Config, source: C, store: S, queue: Queue) -> Self {
    Self {
      dispatcher: Dispatcher::new(source, queue.clone(), config.workers()),
      queue,
      resolver: Resolver::new(store.clone()),
      retrieve_count: config.retrieve_count,
      start_id: config.start_id,
      store,
    }
  }

  pub(crate) async fn run(&self) -> Result {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let mut stdout = io::stdout();

    loop {
      write!(stdout, "{PROMPT}")?;
      stdout.flush()?;

      let Some(line) = lines.next_line().await? else {
        self.queue.purge();
        writeln!(stdout)?;
        return Ok(());
      };

      let command = Command::parse(&line);

      match self.execute(command, &mut stdout).await {
        Ok(ControlFlow::Break(())) => return Ok(()),
        Ok(ControlFlow::Continue(())) => {}
        Err(error) => {
          error!("command failed: {error:#}");
        }
      }
    }
  }
}
