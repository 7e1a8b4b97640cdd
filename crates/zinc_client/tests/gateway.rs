mod common;

use common::{task, Harness};
use pretty_assertions::assert_eq;
use zinc_client::{GatewayError, SettingsStore, WorkerError};
use zinc_core::{
    ClientSettings, DownloadRequest, Msg, Phase, Status, SubtitleSettings,
    TranscriptionSettingsPatch,
};

#[tokio::test]
async fn failed_submission_leaves_no_entry() {
    let h = Harness::new();
    h.worker
        .fail_next(WorkerError::Unavailable("yt-dlp missing".to_string()));

    let result = h
        .gateway
        .submit_download(DownloadRequest::new("https://example.com/v", "best", "Video"))
        .await;

    assert_eq!(
        result,
        Err(GatewayError::Worker(WorkerError::Unavailable(
            "yt-dlp missing".to_string()
        )))
    );
    assert!(h.store.snapshot().await.unwrap().is_empty());
    assert!(h.store.view().ordered.is_empty());
}

#[tokio::test]
async fn failed_local_transcription_leaves_no_entry() {
    let h = Harness::new();
    h.worker
        .fail_next(WorkerError::Rejected("File not found".to_string()));

    let result = h
        .gateway
        .submit_local_transcription("/media/missing.wav", "whisper_rs", "base", "sentence")
        .await;

    assert_eq!(
        result,
        Err(GatewayError::Worker(WorkerError::Rejected(
            "File not found".to_string()
        )))
    );
    assert!(h.store.snapshot().await.unwrap().is_empty());
    assert!(h.store.view().ordered.is_empty());
}

#[tokio::test]
async fn rejected_start_keeps_task_pending() {
    let h = Harness::new();
    h.worker
        .set_snapshot(vec![task("local", "local_transcribe", "pending")]);
    h.gateway.hydrate().await.unwrap();
    h.worker
        .fail_next(WorkerError::Rejected("already started".to_string()));

    assert!(h.gateway.start_local_transcription("local").await.is_err());

    let stored = h.store.get("local").await.unwrap().unwrap();
    assert_eq!(stored.status.to_string(), "pending");
    assert_eq!(stored.phase(), Phase::Pending);
    assert_eq!(h.store.view().find("local").unwrap().phase, Phase::Pending);
}

#[tokio::test]
async fn accepted_submission_is_visible_before_any_push() {
    let h = Harness::new();

    let id = h
        .gateway
        .submit_download(DownloadRequest::new("https://example.com/v", "720p:mp4", "Video"))
        .await
        .unwrap();

    let stored = h.store.get(&id).await.unwrap().expect("optimistic entry");
    assert_eq!(stored.phase(), Phase::Pending);
    assert_eq!(stored.progress, 0.0);
    assert_eq!(stored.url.as_deref(), Some("https://example.com/v"));
    assert_eq!(stored.whisper_model, None);
    assert_eq!(h.store.is_confirmed(&id).await.unwrap(), Some(false));

    let view = h.store.view();
    assert_eq!(view.active.len(), 1);
    assert!(!view.ordered[0].confirmed);
}

#[tokio::test]
async fn subtitle_fields_follow_request_then_defaults() {
    let mut settings = ClientSettings::default();
    settings.transcription.generate_subtitles = true;
    let h = Harness::with_settings(SettingsStore::new(settings));

    let plain = h
        .gateway
        .submit_download(DownloadRequest::new("https://example.com/a", "best", "A"))
        .await
        .unwrap();
    let sent = h.worker.last_request().unwrap();
    assert_eq!(
        sent.subtitle_settings.map(|s| (s.engine, s.model)),
        Some(("whisper_cpp".to_string(), "base".to_string()))
    );
    let stored = h.store.get(&plain).await.unwrap().unwrap();
    assert_eq!(stored.transcription_engine.as_deref(), Some("whisper_cpp"));
    assert_eq!(stored.whisper_model.as_deref(), Some("base"));

    let mut request = DownloadRequest::new("https://example.com/b", "best", "B");
    request.subtitle_settings = Some(SubtitleSettings {
        enabled: false,
        engine: "moonshine".to_string(),
        model: "tiny".to_string(),
        style: "word".to_string(),
    });
    let opted_out = h.gateway.submit_download(request).await.unwrap();
    let stored = h.store.get(&opted_out).await.unwrap().unwrap();
    assert_eq!(stored.transcription_engine, None);
    assert_eq!(stored.whisper_model, None);
}

#[tokio::test]
async fn empty_arguments_never_reach_the_worker() {
    let h = Harness::new();

    let download = h
        .gateway
        .submit_download(DownloadRequest::new("  ", "best", ""))
        .await;
    let local = h
        .gateway
        .submit_local_transcription("", "whisper_cpp", "base", "sentence")
        .await;
    let cancel = h.gateway.cancel("").await;
    let delete = h.gateway.delete("").await;

    assert!(matches!(download, Err(GatewayError::InvalidRequest(_))));
    assert!(matches!(local, Err(GatewayError::InvalidRequest(_))));
    assert!(matches!(cancel, Err(GatewayError::InvalidRequest(_))));
    assert!(matches!(delete, Err(GatewayError::InvalidRequest(_))));
    assert!(h.worker.calls().is_empty());
}

#[tokio::test]
async fn hydration_keeps_worker_order_and_confirms() {
    let h = Harness::new();
    let snapshot = vec![
        task("c", "download", "downloading"),
        task("b", "local_transcribe", "pending"),
        task("a", "download", "completed"),
    ];
    h.worker.set_snapshot(snapshot.clone());

    assert_eq!(h.gateway.hydrate().await.unwrap(), 3);

    assert_eq!(h.store.snapshot().await.unwrap(), snapshot);
    assert_eq!(h.store.is_confirmed("b").await.unwrap(), Some(true));
    let view = h.store.view();
    let active: Vec<&str> = view.active.iter().map(|row| row.id.as_str()).collect();
    assert_eq!(active, vec!["c"]);
    assert!(view.has_completed);
}

#[tokio::test]
async fn clear_completed_removes_only_finished_tasks() {
    let h = Harness::new();
    let mut running = task("run", "download", "downloading");
    running.speed = Some("2.0MiB/s".to_string());
    let waiting = task("wait", "local_transcribe", "pending");
    h.worker.set_snapshot(vec![
        running.clone(),
        task("done", "download", "completed"),
        waiting.clone(),
        task("fail", "download", "error"),
        task("stop", "download", "cancelled"),
    ]);
    h.gateway.hydrate().await.unwrap();

    let mut removed = h.gateway.clear_completed().await.unwrap();
    removed.sort();

    assert_eq!(removed, vec!["done", "fail", "stop"]);
    assert_eq!(h.store.snapshot().await.unwrap(), vec![running, waiting]);
    assert!(!h.store.view().has_completed);
}

#[tokio::test]
async fn failed_clear_keeps_everything() {
    let h = Harness::new();
    h.worker
        .set_snapshot(vec![task("done", "download", "completed")]);
    h.gateway.hydrate().await.unwrap();
    h.worker.fail_next(WorkerError::Rejected("busy".to_string()));

    assert!(h.gateway.clear_completed().await.is_err());
    assert_eq!(h.store.snapshot().await.unwrap().len(), 1);
}

#[tokio::test]
async fn cancel_marks_record_and_late_push_overrides_it() {
    let h = Harness::new();
    let mut downloading = task("t", "download", "downloading");
    downloading.output_path = Some("Clip.mp4".to_string());
    h.worker.set_snapshot(vec![downloading]);
    h.gateway.hydrate().await.unwrap();

    h.gateway.cancel("t").await.unwrap();
    let cancelled = h.store.get("t").await.unwrap().unwrap();
    assert_eq!(cancelled.phase(), Phase::Cancelled);
    assert_eq!(cancelled.output_path.as_deref(), Some("Clip.mp4"));
    assert_eq!(cancelled.progress, 42.0);
    assert_eq!(h.store.is_confirmed("t").await.unwrap(), Some(false));

    // The worker had already finished before it saw the cancel.
    let completed = task("t", "download", "completed");
    h.store
        .apply(Msg::TaskPushed(completed.clone()))
        .await
        .unwrap();
    assert_eq!(h.store.get("t").await.unwrap(), Some(completed));
}

#[tokio::test]
async fn rejected_cancel_keeps_status() {
    let h = Harness::new();
    h.worker
        .set_snapshot(vec![task("t", "download", "downloading")]);
    h.gateway.hydrate().await.unwrap();
    h.worker
        .fail_next(WorkerError::NotFound("t".to_string()));

    assert!(h.gateway.cancel("t").await.is_err());
    assert_eq!(
        h.store.get("t").await.unwrap().unwrap().phase(),
        Phase::Downloading
    );
}

#[tokio::test]
async fn delete_waits_for_worker_and_blocks_stray_events() {
    let h = Harness::new();
    h.worker
        .set_snapshot(vec![task("t", "download", "downloading")]);
    h.gateway.hydrate().await.unwrap();

    h.worker.fail_next(WorkerError::Rejected("locked".to_string()));
    assert!(h.gateway.delete("t").await.is_err());
    assert!(h.store.get("t").await.unwrap().is_some());

    h.gateway.delete("t").await.unwrap();
    assert_eq!(h.store.get("t").await.unwrap(), None);

    let changes = h
        .store
        .apply(Msg::TaskPushed(task("t", "download", "completed")))
        .await
        .unwrap();
    assert!(changes.is_empty());
    assert_eq!(h.store.get("t").await.unwrap(), None);
}

#[tokio::test]
async fn local_transcription_flow() {
    let h = Harness::new();

    let id = h
        .gateway
        .submit_local_transcription("/media/clips/interview.mkv", "whisper_rs", "small", "word")
        .await
        .unwrap();
    let pending = h.store.get(&id).await.unwrap().unwrap();
    assert_eq!(pending.title, "interview.mkv");
    assert_eq!(pending.output_path.as_deref(), Some("/media/clips/interview.mkv"));
    assert_eq!(pending.source_path.as_deref(), Some("/media/clips/interview.mkv"));
    assert!(h.store.view().active.is_empty());

    h.gateway
        .update_transcription_settings(
            &id,
            TranscriptionSettingsPatch {
                model: Some("medium".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let updated = h.store.get(&id).await.unwrap().unwrap();
    assert_eq!(updated.whisper_model.as_deref(), Some("medium"));
    assert_eq!(updated.transcription_engine.as_deref(), Some("whisper_rs"));
    assert_eq!(updated.phase(), Phase::Pending);

    h.gateway.start_local_transcription(&id).await.unwrap();
    let started = h.store.get(&id).await.unwrap().unwrap();
    assert_eq!(started.status.to_string(), "transcribing:extracting");

    let view = h.store.view();
    let row = view.find(&id).unwrap();
    assert_eq!(row.stage_message, Some("Extracting audio..."));
    assert_eq!(view.active.len(), 1);
}

#[tokio::test]
async fn acknowledgement_after_scope_end_is_not_applied() {
    let h = Harness::new();
    let gate = h.worker.hold_calls();

    let gateway = h.gateway.clone();
    let call = tokio::spawn(async move {
        gateway
            .submit_download(DownloadRequest::new("https://example.com/v", "best", "Video"))
            .await
    });
    tokio::task::yield_now().await;
    h.scope.cancel();
    gate.notify_one();

    let id = call.await.unwrap().unwrap();
    assert_eq!(id, "job-1");
    assert_eq!(h.store.get(&id).await.unwrap(), None);
}

#[tokio::test]
async fn closed_store_still_returns_worker_result() {
    let h = Harness::new();
    h.store.shutdown();

    let id = h
        .gateway
        .submit_download(DownloadRequest::new("https://example.com/v", "best", "Video"))
        .await
        .unwrap();

    assert_eq!(id, "job-1");
    assert!(h.store.snapshot().await.is_err());
}

#[tokio::test]
async fn completed_with_error_reads_as_warning() {
    let h = Harness::new();
    let mut degraded = task("t", "download", "completed");
    degraded.error = Some("Subtitle generation failed: no audio".to_string());
    h.worker.set_snapshot(vec![degraded]);
    h.gateway.hydrate().await.unwrap();

    let view = h.store.view();
    let row = view.find("t").unwrap();
    assert_eq!(
        row.status,
        Status::Completed {
            warning: Some("Subtitle generation failed: no audio".to_string())
        }
    );
    assert_eq!(view.completed.len(), 1);
}
