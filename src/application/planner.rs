use crate::application::calendar_feed::CalendarFeedService;
use crate::application::drag_engine::{DragEngine, ReleaseOutcome};
use crate::application::drop_animation::DropAnimator;
use crate::application::task_store::{NowProvider, TaskStore};
use crate::domain::calendar_preview::{PreviewSlot, ResizePreview, build_calendar_preview};
use crate::domain::drop_target::DragOver;
use crate::domain::flat_list::PreviewContext;
use crate::domain::models::{CalendarSlot, DragPayload};
use crate::domain::time_grid::Point;
use crate::infrastructure::config::PlannerConfig;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::google_calendar_client::CalendarEventSource;
use crate::infrastructure::snapshot_codec::{
    decode_calendar_settings, decode_task_document, encode_calendar_settings, encode_task_document,
};
use crate::infrastructure::storage::{CALENDAR_SETTINGS_KEY, KeyValueStore, TASKS_KEY, migrate_legacy_keys};
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use tracing::{info, warn};

/// Drag engine whose drop handlers act on the task store.
pub type PlannerDragEngine = DragEngine<DragPayload, TaskStore>;

/// Application state: the task store, the calendar feed and the running drop animation, backed
/// by a key-value store.
pub struct Planner<C>
where
    C: CalendarEventSource,
{
    config: PlannerConfig,
    storage: Arc<dyn KeyValueStore>,
    store: TaskStore,
    feed: CalendarFeedService<C>,
    animator: DropAnimator,
}

impl<C> Planner<C>
where
    C: CalendarEventSource,
{
    pub fn load(config: PlannerConfig, storage: Arc<dyn KeyValueStore>, client: Arc<C>) -> Result<Self, InfraError> {
        Self::load_with_clock(config, storage, client, Arc::new(Utc::now))
    }

    /// Migrates legacy keys, restores both documents and starts persisting every committed change.
    pub fn load_with_clock(
        config: PlannerConfig,
        storage: Arc<dyn KeyValueStore>,
        client: Arc<C>,
        now_provider: NowProvider,
    ) -> Result<Self, InfraError> {
        let migrated = migrate_legacy_keys(storage.as_ref())?;
        let now = now_provider();

        let state = match storage.get(TASKS_KEY)? {
            Some(raw) => decode_task_document(&raw, now),
            None => Default::default(),
        };
        let settings = match storage.get(CALENDAR_SETTINGS_KEY)? {
            Some(raw) => decode_calendar_settings(&raw, now),
            None => Default::default(),
        };
        info!(
            tasks = state.tasks.len(),
            drafts = state.calendar_draft_slots.len(),
            migrated = migrated.len(),
            "planner loaded"
        );

        let mut store = TaskStore::new(state)
            .with_timezone(config.timezone)
            .with_default_slot_duration(config.default_slot_duration)
            .with_now_provider(now_provider.clone());
        let persisted = storage.clone();
        store.subscribe(move |state| {
            let saved = encode_task_document(state).and_then(|raw| persisted.set(TASKS_KEY, &raw));
            if let Err(error) = saved {
                warn!(%error, "failed to persist tasks");
            }
        });

        let feed = CalendarFeedService::new(client)
            .with_config(config.feed)
            .with_timezone(config.timezone)
            .with_now_provider(now_provider)
            .with_settings(settings);

        Ok(Self {
            animator: DropAnimator::new(config.prefers_reduced_motion),
            config,
            storage,
            store,
            feed,
        })
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut TaskStore {
        &mut self.store
    }

    pub fn feed(&self) -> &CalendarFeedService<C> {
        &self.feed
    }

    pub fn animator(&self) -> &DropAnimator {
        &self.animator
    }

    pub fn animator_mut(&mut self) -> &mut DropAnimator {
        &mut self.animator
    }

    /// Writes both documents.
    pub fn save(&self) -> Result<(), InfraError> {
        self.storage.set(TASKS_KEY, &encode_task_document(self.store.state())?)?;
        self.save_calendar_settings()
    }

    fn save_calendar_settings(&self) -> Result<(), InfraError> {
        let raw = encode_calendar_settings(&self.feed.settings())?;
        self.storage.set(CALENDAR_SETTINGS_KEY, &raw)
    }

    pub fn connect_calendar(&mut self, access_token: &str, expires_in_seconds: i64) -> Result<(), InfraError> {
        self.feed.connect(access_token, expires_in_seconds);
        self.save_calendar_settings()
    }

    pub fn disconnect_calendar(&mut self) -> Result<(), InfraError> {
        self.feed.disconnect();
        self.save_calendar_settings()
    }

    /// Fetches the feed and persists the connection, which a rejected token clears.
    pub async fn refresh_calendar(&mut self) -> Result<usize, InfraError> {
        let fetched = self.feed.fetch_events().await;
        self.save_calendar_settings()?;
        fetched
    }

    /// Poll tick: fetches only when the last fetch is older than the poll interval.
    pub async fn refresh_calendar_if_due(&mut self, now: DateTime<Utc>) -> Option<Result<usize, InfraError>> {
        if !self.feed.needs_refresh(now) {
            return None;
        }
        Some(self.refresh_calendar().await)
    }

    /// Task blocks, draft slots and external events of `date`.
    pub fn day_slots(&self, date: NaiveDate) -> Vec<CalendarSlot> {
        self.store.slots_for_day(date, self.feed.events())
    }

    pub fn day_preview(
        &self,
        date: NaiveDate,
        ctx: &PreviewContext<'_>,
        resize: Option<&ResizePreview>,
    ) -> Vec<PreviewSlot> {
        build_calendar_preview(
            &self.day_slots(date),
            date,
            self.config.timezone,
            ctx,
            resize,
            self.config.drag.round_minutes,
            self.store.default_slot_duration(),
        )
    }

    /// Ends the pointer interaction, runs the drop handler against the store and starts the
    /// matching drop animation.
    pub fn release(&mut self, engine: &mut PlannerDragEngine, pointer_id: i64, position: Point) -> ReleaseOutcome<DragPayload> {
        let outcome = engine.pointer_up(pointer_id, position, &mut self.store);
        match &outcome {
            ReleaseOutcome::Dropped {
                over: Some(DragOver::List(_)),
                payload,
                source,
                overlay,
                ..
            } => {
                self.animator.begin_list_drop(payload, source.as_ref(), *overlay);
            }
            ReleaseOutcome::Dropped {
                over: Some(DragOver::Calendar(_)),
                payload,
                source,
                overlay,
                ..
            } => {
                self.animator.begin_calendar_drop(payload, source.as_ref(), *overlay);
            }
            ReleaseOutcome::Cancelled { payload, overlay, .. } => {
                if let Some(task) = payload.task() {
                    self.animator.begin_cancel(task, *overlay);
                }
            }
            _ => {}
        }
        outcome
    }

    /// Next frame after a release: aims the running animation at the card's new position.
    pub fn settle_animation(&mut self, engine: &PlannerDragEngine) {
        let landed = self
            .animator
            .current()
            .and_then(|animation| engine.item_rect(&animation.task.id));
        self.animator.settle(landed);
    }
}
