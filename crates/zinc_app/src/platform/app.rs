use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use zinc_client::{
    CommandGateway, EventReconciler, LocalWorker, SettingsStore, TaskStore, Worker,
};
use zinc_core::{DownloadRequest, SubtitleSettings, TaskListView};
use zinc_logging::{zinc_error, zinc_info, zinc_warn};

use super::{persistence, render};

/// Work requested on the command line.
#[derive(Debug, Clone)]
pub enum Jobs {
    Downloads {
        urls: Vec<String>,
        format: String,
        subtitles: bool,
    },
    /// Engine, model and style fall back to the configured defaults.
    Transcriptions {
        paths: Vec<String>,
        engine: Option<String>,
        model: Option<String>,
        style: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub settings_path: PathBuf,
    pub use_cpu: bool,
    pub clear_completed: bool,
    pub jobs: Jobs,
}

pub async fn run_app(options: RunOptions) -> anyhow::Result<()> {
    let mut loaded = persistence::load_settings(&options.settings_path);
    if options.use_cpu {
        loaded.use_gpu = false;
    }
    let settings = SettingsStore::new(loaded);

    let worker = Arc::new(LocalWorker::default());
    let store = TaskStore::spawn(settings.clone());
    let scope = CancellationToken::new();
    let gateway = CommandGateway::new(
        worker.clone() as Arc<dyn Worker>,
        store.clone(),
        settings.clone(),
        scope.clone(),
    );
    let reconciler = EventReconciler::subscribe(worker.as_ref(), store.clone(), &scope)
        .context("subscribing to worker events")?;

    gateway.hydrate().await.context("loading existing tasks")?;
    let submitted = submit(&gateway, &settings, options.jobs).await;
    zinc_info!("Submitted {} job(s)", submitted);

    let final_view = follow_until_idle(&store).await;
    if options.clear_completed && final_view.has_completed {
        match gateway.clear_completed().await {
            Ok(removed) => zinc_info!("Cleared {} finished task(s)", removed.len()),
            Err(err) => zinc_warn!("Could not clear finished tasks: {}", err),
        }
    }

    persistence::save_settings(&options.settings_path, &settings.current());

    scope.cancel();
    let stats = reconciler.shutdown().await;
    zinc_info!(
        "Processed {} worker event(s), {} malformed",
        stats.received,
        stats.malformed
    );
    store.shutdown();
    Ok(())
}

async fn submit(gateway: &CommandGateway, settings: &SettingsStore, jobs: Jobs) -> usize {
    let defaults = settings.current().transcription;
    let mut submitted = 0;
    match jobs {
        Jobs::Downloads {
            urls,
            format,
            subtitles,
        } => {
            for url in urls {
                let mut request = DownloadRequest::new(url.clone(), format.clone(), url.clone());
                if subtitles {
                    request.subtitle_settings = Some(SubtitleSettings {
                        enabled: true,
                        engine: defaults.engine.clone(),
                        model: defaults.model.clone(),
                        style: defaults.style.clone(),
                    });
                }
                match gateway.submit_download(request).await {
                    Ok(_) => submitted += 1,
                    Err(err) => zinc_error!("Download of {} not started: {}", url, err),
                }
            }
        }
        Jobs::Transcriptions {
            paths,
            engine,
            model,
            style,
        } => {
            let engine = engine.unwrap_or(defaults.engine);
            let model = model.unwrap_or(defaults.model);
            let style = style.unwrap_or(defaults.style);
            for path in paths {
                let added = gateway
                    .submit_local_transcription(&path, &engine, &model, &style)
                    .await;
                let id = match added {
                    Ok(id) => id,
                    Err(err) => {
                        zinc_error!("Transcription of {} not added: {}", path, err);
                        continue;
                    }
                };
                match gateway.start_local_transcription(&id).await {
                    Ok(()) => submitted += 1,
                    Err(err) => zinc_error!("Transcription {} not started: {}", id, err),
                }
            }
        }
    }
    submitted
}

/// Prints the task list on every view change until nothing is active.
async fn follow_until_idle(store: &TaskStore) -> TaskListView {
    let mut views = store.watch_view();
    loop {
        let view = views.borrow_and_update().clone();
        for line in render::render(&view) {
            println!("{line}");
        }
        if view.active.is_empty() {
            return view;
        }
        if views.changed().await.is_err() {
            zinc_warn!("Task store stopped while jobs were active");
            return view;
        }
    }
}
