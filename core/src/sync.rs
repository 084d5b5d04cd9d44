//! Bidirectional synchronization between the local state store and a remote
//! per-user document store.
//!
//! This is a conflict-avoidance heuristic, not a consistency protocol: pushes
//! are debounced whole-collection snapshots, remote updates are applied only
//! when they cannot clobber unsynced local edits, and "remote list grew" is
//! taken as evidence of a legitimate concurrent addition. The bias is to
//! never lose local work, at the cost of sometimes ignoring concurrent
//! remote edits.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::models::{
    ChatConversation, DiaryEntry, FoodItem, MacroTargets, UserProfile, WeightEntry, WorkoutSession,
};
use crate::store::Store;

/// Quiet period after the last qualifying mutation before a push fires.
pub const PUSH_DEBOUNCE: Duration = Duration::from_secs(1);

/// Every logical collection in the remote document store.
pub const SYNC_COLLECTIONS: &[&str] = &[
    "profile",
    "targets",
    "weights",
    "foods",
    "diary",
    "workouts",
    "chat_conversations",
];

/// A change delivered by the remote live-update channel.
#[derive(Debug, Clone)]
pub enum RemoteChange {
    Profile(Option<UserProfile>),
    Targets(Option<MacroTargets>),
    Weights(Vec<WeightEntry>),
    Foods(Vec<FoodItem>),
    Diary(Vec<DiaryEntry>),
    Workouts(Vec<WorkoutSession>),
}

/// Handle to a live-update subscription. Dropping it tears down the
/// underlying delivery task, if any.
pub struct Subscription {
    pub rx: mpsc::Receiver<RemoteChange>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    #[must_use]
    pub fn new(rx: mpsc::Receiver<RemoteChange>) -> Self {
        Subscription { rx, task: None }
    }

    #[must_use]
    pub fn with_task(rx: mpsc::Receiver<RemoteChange>, task: JoinHandle<()>) -> Self {
        Subscription {
            rx,
            task: Some(task),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }
}

/// Per-collection operations against the remote document store, keyed by the
/// owning user. Implementations filter remote-side records by owner
/// themselves; no server-side query scoping is assumed.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn load_profile(&self, user_id: &str) -> Result<Option<UserProfile>>;
    async fn load_targets(&self, user_id: &str) -> Result<Option<MacroTargets>>;
    async fn load_weights(&self, user_id: &str) -> Result<Vec<WeightEntry>>;
    async fn load_foods(&self, user_id: &str) -> Result<Vec<FoodItem>>;
    async fn load_diary(&self, user_id: &str) -> Result<Vec<DiaryEntry>>;
    async fn load_workouts(&self, user_id: &str) -> Result<Vec<WorkoutSession>>;

    /// Upsert the singleton document, or delete it when `profile` is `None`.
    async fn push_profile(&self, user_id: &str, profile: Option<&UserProfile>) -> Result<()>;
    async fn push_targets(&self, user_id: &str, targets: Option<&MacroTargets>) -> Result<()>;

    /// Reconcile the remote collection to exactly `entries`: documents whose
    /// id is no longer present locally are deleted, then every local record
    /// is upserted.
    async fn replace_weights(&self, user_id: &str, entries: &[WeightEntry]) -> Result<()>;
    async fn replace_foods(&self, user_id: &str, entries: &[FoodItem]) -> Result<()>;
    async fn replace_diary(&self, user_id: &str, entries: &[DiaryEntry]) -> Result<()>;
    async fn replace_workouts(&self, user_id: &str, entries: &[WorkoutSession]) -> Result<()>;

    async fn load_conversation(&self, user_id: &str) -> Result<Option<ChatConversation>>;
    async fn save_conversation(
        &self,
        user_id: &str,
        conversation: &ChatConversation,
    ) -> Result<()>;

    fn subscribe(&self, user_id: &str) -> Subscription;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Unauthenticated,
    Hydrating,
    Live,
}

/// Stand-in remote when no backend is configured: every operation is a
/// no-op returning nothing, so the app keeps working fully local.
pub struct DisabledRemote;

#[async_trait]
impl RemoteStore for DisabledRemote {
    async fn load_profile(&self, _user_id: &str) -> Result<Option<UserProfile>> {
        Ok(None)
    }
    async fn load_targets(&self, _user_id: &str) -> Result<Option<MacroTargets>> {
        Ok(None)
    }
    async fn load_weights(&self, _user_id: &str) -> Result<Vec<WeightEntry>> {
        Ok(Vec::new())
    }
    async fn load_foods(&self, _user_id: &str) -> Result<Vec<FoodItem>> {
        Ok(Vec::new())
    }
    async fn load_diary(&self, _user_id: &str) -> Result<Vec<DiaryEntry>> {
        Ok(Vec::new())
    }
    async fn load_workouts(&self, _user_id: &str) -> Result<Vec<WorkoutSession>> {
        Ok(Vec::new())
    }
    async fn push_profile(&self, _user_id: &str, _profile: Option<&UserProfile>) -> Result<()> {
        Ok(())
    }
    async fn push_targets(&self, _user_id: &str, _targets: Option<&MacroTargets>) -> Result<()> {
        Ok(())
    }
    async fn replace_weights(&self, _user_id: &str, _entries: &[WeightEntry]) -> Result<()> {
        Ok(())
    }
    async fn replace_foods(&self, _user_id: &str, _entries: &[FoodItem]) -> Result<()> {
        Ok(())
    }
    async fn replace_diary(&self, _user_id: &str, _entries: &[DiaryEntry]) -> Result<()> {
        Ok(())
    }
    async fn replace_workouts(&self, _user_id: &str, _entries: &[WorkoutSession]) -> Result<()> {
        Ok(())
    }
    async fn load_conversation(&self, _user_id: &str) -> Result<Option<ChatConversation>> {
        Ok(None)
    }
    async fn save_conversation(
        &self,
        _user_id: &str,
        _conversation: &ChatConversation,
    ) -> Result<()> {
        Ok(())
    }
    fn subscribe(&self, _user_id: &str) -> Subscription {
        let (_tx, rx) = mpsc::channel(1);
        Subscription::new(rx)
    }
}

/// Serialized form of a list collection as of the last successful sync,
/// used to distinguish pending local edits from settled state.
#[derive(Debug, Clone, Default)]
struct SyncedSnapshot {
    json: String,
    len: usize,
}

impl SyncedSnapshot {
    fn record<T: Serialize>(items: &[T]) -> Self {
        SyncedSnapshot {
            json: to_json(&items),
            len: items.len(),
        }
    }
}

#[derive(Debug, Default)]
struct Snapshots {
    weights: SyncedSnapshot,
    foods: SyncedSnapshot,
    diary: SyncedSnapshot,
    workouts: SyncedSnapshot,
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

/// One sync session for one authenticated user: hydrate once, then keep the
/// local store and the remote collections approximately consistent until
/// shutdown.
pub struct Reconciler {
    store: Store,
    remote: Arc<dyn RemoteStore>,
    user_id: String,
    push_in_flight: Arc<AtomicBool>,
    snapshots: Arc<Mutex<Snapshots>>,
    hydrated: AtomicBool,
    state: Mutex<SyncState>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Reconciler {
    #[must_use]
    pub fn new(store: Store, remote: Arc<dyn RemoteStore>, user_id: impl Into<String>) -> Self {
        Reconciler {
            store,
            remote,
            user_id: user_id.into(),
            push_in_flight: Arc::new(AtomicBool::new(false)),
            snapshots: Arc::new(Mutex::new(Snapshots::default())),
            hydrated: AtomicBool::new(false),
            state: Mutex::new(SyncState::Hydrating),
            tasks: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn state(&self) -> SyncState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// One-time load of every collection from the remote store. Singletons
    /// replace local state only when present; lists only when non-empty, so
    /// an empty remote never clobbers seeded or offline-created data. Runs
    /// exactly once per session; later calls are no-ops.
    pub async fn hydrate(&self) {
        if self.hydrated.swap(true, Ordering::SeqCst) {
            return;
        }

        let uid = self.user_id.as_str();
        let (profile, targets, weights, foods, diary, workouts) = tokio::join!(
            self.remote.load_profile(uid),
            self.remote.load_targets(uid),
            self.remote.load_weights(uid),
            self.remote.load_foods(uid),
            self.remote.load_diary(uid),
            self.remote.load_workouts(uid),
        );

        let loaded = (|| {
            Ok::<_, anyhow::Error>((profile?, targets?, weights?, foods?, diary?, workouts?))
        })();

        match loaded {
            Ok((profile, targets, weights, foods, diary, workouts)) => {
                // Profile first: applying it re-derives targets, which the
                // remote targets document then overrides if present.
                if let Some(profile) = profile {
                    self.store.set_profile(profile);
                }
                if let Some(targets) = targets {
                    self.store.set_targets(targets);
                }
                if !weights.is_empty() {
                    self.store.set_weights(weights);
                }
                if !foods.is_empty() {
                    self.store.set_foods(foods);
                }
                if !diary.is_empty() {
                    self.store.set_diary(diary);
                }
                if !workouts.is_empty() {
                    self.store.set_workouts(workouts);
                }

                let mut snaps = self
                    .snapshots
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                snaps.weights = SyncedSnapshot::record(&self.store.weights());
                snaps.foods = SyncedSnapshot::record(&self.store.foods());
                snaps.diary = SyncedSnapshot::record(&self.store.diary());
                snaps.workouts = SyncedSnapshot::record(&self.store.workouts());
            }
            Err(e) => {
                log::error!("Failed to load data from remote store: {e:#}");
            }
        }

        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = SyncState::Live;
    }

    /// Start the live behaviors: debounced push-on-change and remote
    /// live-update application. Call after [`Self::hydrate`].
    pub fn start(&self) {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);

        // (a) push-on-change with a restartable debounce deadline
        {
            let store = self.store.clone();
            let remote = Arc::clone(&self.remote);
            let user_id = self.user_id.clone();
            let in_flight = Arc::clone(&self.push_in_flight);
            let snapshots = Arc::clone(&self.snapshots);
            let mut events = self.store.subscribe();

            tasks.push(tokio::spawn(async move {
                let mut deadline: Option<Instant> = None;
                loop {
                    tokio::select! {
                        event = events.recv() => match event {
                            Ok(c) if c.is_synced() => {
                                deadline = Some(Instant::now() + PUSH_DEBOUNCE);
                            }
                            Ok(_) => {}
                            Err(broadcast::error::RecvError::Lagged(_)) => {
                                deadline = Some(Instant::now() + PUSH_DEBOUNCE);
                            }
                            Err(broadcast::error::RecvError::Closed) => break,
                        },
                        () = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)),
                            if deadline.is_some() =>
                        {
                            deadline = None;
                            push_all(&store, remote.as_ref(), &user_id, &in_flight, &snapshots)
                                .await;
                        }
                    }
                }
            }));
        }

        // (b) remote live updates
        {
            let store = self.store.clone();
            let in_flight = Arc::clone(&self.push_in_flight);
            let snapshots = Arc::clone(&self.snapshots);
            let mut subscription = self.remote.subscribe(&self.user_id);

            tasks.push(tokio::spawn(async move {
                while let Some(change) = subscription.rx.recv().await {
                    apply_remote_change(&store, &in_flight, &snapshots, change);
                }
            }));
        }
    }

    /// Push the current store state immediately, bypassing the debounce.
    /// A push already in flight suppresses this one.
    pub async fn push_now(&self) {
        push_all(
            &self.store,
            self.remote.as_ref(),
            &self.user_id,
            &self.push_in_flight,
            &self.snapshots,
        )
        .await;
    }

    /// Apply one remote change through the merge policy. The live-update
    /// task calls this for every delivered change.
    pub fn apply_remote(&self, change: RemoteChange) {
        apply_remote_change(&self.store, &self.push_in_flight, &self.snapshots, change);
    }

    /// Logout: tear down timers and subscriptions. In-flight operations are
    /// not cancelled; they complete unobserved.
    pub fn shutdown(&self) {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        for task in tasks.drain(..) {
            task.abort();
        }
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = SyncState::Unauthenticated;
    }
}

impl Drop for Reconciler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn push_all(
    store: &Store,
    remote: &dyn RemoteStore,
    user_id: &str,
    in_flight: &AtomicBool,
    snapshots: &Mutex<Snapshots>,
) {
    if in_flight.swap(true, Ordering::SeqCst) {
        // A push is running; the next mutation cycle picks these edits up.
        return;
    }

    let state = store.snapshot();
    let (profile, targets, weights, foods, diary, workouts) = tokio::join!(
        remote.push_profile(user_id, state.profile.as_ref()),
        remote.push_targets(user_id, state.targets.as_ref()),
        remote.replace_weights(user_id, &state.weights),
        remote.replace_foods(user_id, &state.foods),
        remote.replace_diary(user_id, &state.diary),
        remote.replace_workouts(user_id, &state.workouts),
    );

    let results = [
        ("profile", profile),
        ("targets", targets),
        ("weights", weights),
        ("foods", foods),
        ("diary", diary),
        ("workouts", workouts),
    ];
    let mut all_ok = true;
    for (collection, result) in results {
        if let Err(e) = result {
            all_ok = false;
            log::error!("Failed to push {collection} to remote store: {e:#}");
        }
    }

    // Partial pushes are not retried; last-synced only advances when the
    // whole snapshot made it out.
    if all_ok {
        let mut snaps = snapshots.lock().unwrap_or_else(PoisonError::into_inner);
        snaps.weights = SyncedSnapshot::record(&state.weights);
        snaps.foods = SyncedSnapshot::record(&state.foods);
        snaps.diary = SyncedSnapshot::record(&state.diary);
        snaps.workouts = SyncedSnapshot::record(&state.workouts);
        log::debug!("Pushed all collections for user {user_id}");
    }

    in_flight.store(false, Ordering::SeqCst);
}

fn apply_remote_change(
    store: &Store,
    in_flight: &AtomicBool,
    snapshots: &Mutex<Snapshots>,
    change: RemoteChange,
) {
    if in_flight.load(Ordering::SeqCst) {
        return;
    }

    match change {
        RemoteChange::Profile(Some(profile)) => {
            if store.profile().as_ref() != Some(&profile) {
                store.set_profile(profile);
            }
        }
        RemoteChange::Targets(Some(targets)) => {
            if store.targets() != Some(targets) {
                store.set_targets(targets);
            }
        }
        // A vanished singleton is ignored rather than deleted locally.
        RemoteChange::Profile(None) | RemoteChange::Targets(None) => {}
        RemoteChange::Weights(remote) => {
            let mut snaps = snapshots.lock().unwrap_or_else(PoisonError::into_inner);
            apply_remote_list(remote, &store.weights(), &mut snaps.weights, false, |v| {
                store.set_weights(v);
            });
        }
        RemoteChange::Foods(remote) => {
            let mut snaps = snapshots.lock().unwrap_or_else(PoisonError::into_inner);
            apply_remote_list(remote, &store.foods(), &mut snaps.foods, true, |v| {
                store.set_foods(v);
            });
        }
        RemoteChange::Diary(remote) => {
            let mut snaps = snapshots.lock().unwrap_or_else(PoisonError::into_inner);
            apply_remote_list(remote, &store.diary(), &mut snaps.diary, true, |v| {
                store.set_diary(v);
            });
        }
        RemoteChange::Workouts(remote) => {
            let mut snaps = snapshots.lock().unwrap_or_else(PoisonError::into_inner);
            apply_remote_list(remote, &store.workouts(), &mut snaps.workouts, false, |v| {
                store.set_workouts(v);
            });
        }
    }
}

/// The list merge policy. Applies `remote` only when it differs from both
/// the current local state and the last-synced snapshot, and either the
/// local state carries no pending edits (it equals last-synced) or the
/// remote list is strictly longer than last-synced. `guard_empty` keeps an
/// empty remote list from wiping existing local data.
fn apply_remote_list<T: Serialize>(
    remote: Vec<T>,
    local: &[T],
    last_synced: &mut SyncedSnapshot,
    guard_empty: bool,
    apply: impl FnOnce(Vec<T>),
) {
    let remote_json = to_json(&remote);
    let local_json = to_json(&local);

    if remote_json == local_json || remote_json == last_synced.json {
        return;
    }
    if guard_empty && remote.is_empty() && !local.is_empty() {
        return;
    }
    if local_json == last_synced.json || remote.len() > last_synced.len {
        *last_synced = SyncedSnapshot {
            json: remote_json,
            len: remote.len(),
        };
        apply(remote);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ActivityLevel, Gender, Goal, MealType, NewDiaryEntry, NewFoodItem, UnitSystem, new_id,
    };
    use chrono::NaiveDate;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    fn food(name: &str) -> FoodItem {
        NewFoodItem {
            name: name.to_string(),
            serving_size: "100 g".to_string(),
            calories: 100.0,
            protein_grams: 10.0,
            carb_grams: 10.0,
            fat_grams: 2.0,
            ..NewFoodItem::default()
        }
        .with_id(new_id())
    }

    fn diary_entry(id: &str, name: &str) -> DiaryEntry {
        DiaryEntry {
            id: id.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
            meal: MealType::Lunch,
            food: food(name),
            quantity: 1.0,
        }
    }

    fn weight(id: &str, kg: f64) -> WeightEntry {
        WeightEntry {
            id: id.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
            weight_kg: kg,
        }
    }

    fn profile() -> UserProfile {
        UserProfile {
            name: None,
            unit_system: UnitSystem::Metric,
            height_cm: 180.0,
            weight_kg: 80.0,
            age: 30,
            gender: Gender::Male,
            activity_level: ActivityLevel::Moderate,
            goal: Goal::Maintain,
            goal_weight_kg: None,
            cardio_days_per_week: None,
            training_days_per_week: None,
        }
    }

    #[derive(Default)]
    struct MockRemote {
        profile: Option<UserProfile>,
        targets: Option<MacroTargets>,
        weights: Vec<WeightEntry>,
        foods: Vec<FoodItem>,
        diary: Vec<DiaryEntry>,
        workouts: Vec<WorkoutSession>,
        fail_loads: bool,
        push_count: AtomicUsize,
        pushed_diary: Mutex<Vec<Vec<DiaryEntry>>>,
        push_started: Notify,
        push_gate: Option<Arc<Notify>>,
    }

    #[async_trait]
    impl RemoteStore for MockRemote {
        async fn load_profile(&self, _u: &str) -> Result<Option<UserProfile>> {
            if self.fail_loads {
                anyhow::bail!("remote unavailable");
            }
            Ok(self.profile.clone())
        }
        async fn load_targets(&self, _u: &str) -> Result<Option<MacroTargets>> {
            Ok(self.targets)
        }
        async fn load_weights(&self, _u: &str) -> Result<Vec<WeightEntry>> {
            Ok(self.weights.clone())
        }
        async fn load_foods(&self, _u: &str) -> Result<Vec<FoodItem>> {
            Ok(self.foods.clone())
        }
        async fn load_diary(&self, _u: &str) -> Result<Vec<DiaryEntry>> {
            Ok(self.diary.clone())
        }
        async fn load_workouts(&self, _u: &str) -> Result<Vec<WorkoutSession>> {
            Ok(self.workouts.clone())
        }

        async fn push_profile(&self, _u: &str, _p: Option<&UserProfile>) -> Result<()> {
            self.push_started.notify_one();
            if let Some(gate) = &self.push_gate {
                gate.notified().await;
            }
            Ok(())
        }
        async fn push_targets(&self, _u: &str, _t: Option<&MacroTargets>) -> Result<()> {
            Ok(())
        }
        async fn replace_weights(&self, _u: &str, _e: &[WeightEntry]) -> Result<()> {
            Ok(())
        }
        async fn replace_foods(&self, _u: &str, _e: &[FoodItem]) -> Result<()> {
            Ok(())
        }
        async fn replace_diary(&self, _u: &str, entries: &[DiaryEntry]) -> Result<()> {
            self.push_count.fetch_add(1, Ordering::SeqCst);
            self.pushed_diary
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(entries.to_vec());
            Ok(())
        }
        async fn replace_workouts(&self, _u: &str, _e: &[WorkoutSession]) -> Result<()> {
            Ok(())
        }

        async fn load_conversation(&self, _u: &str) -> Result<Option<ChatConversation>> {
            Ok(None)
        }
        async fn save_conversation(&self, _u: &str, _c: &ChatConversation) -> Result<()> {
            Ok(())
        }

        fn subscribe(&self, _u: &str) -> Subscription {
            let (_tx, rx) = mpsc::channel(8);
            Subscription::new(rx)
        }
    }

    #[tokio::test]
    async fn test_hydration_applies_remote_data() {
        let store = Store::in_memory();
        let remote = Arc::new(MockRemote {
            profile: Some(profile()),
            weights: vec![weight("w1", 80.0), weight("w2", 79.5)],
            ..MockRemote::default()
        });
        let sync = Reconciler::new(store.clone(), remote, "u1");

        assert_eq!(sync.state(), SyncState::Hydrating);
        sync.hydrate().await;
        assert_eq!(sync.state(), SyncState::Live);

        assert!(store.profile().is_some());
        // Remote had no targets document, so derived targets stand.
        assert_eq!(store.targets().unwrap().calories, 2759);
        assert_eq!(store.weights().len(), 2);
    }

    #[tokio::test]
    async fn test_hydration_empty_remote_keeps_local_lists() {
        let store = Store::in_memory();
        store.add_weight(NaiveDate::from_ymd_opt(2024, 6, 14).unwrap(), 80.0);
        store.add_weight(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(), 79.5);

        let sync = Reconciler::new(store.clone(), Arc::new(MockRemote::default()), "u1");
        sync.hydrate().await;

        assert_eq!(store.weights().len(), 2);
        // The seeded foods library also survives an empty remote.
        assert_eq!(store.foods().len(), 3);
    }

    #[tokio::test]
    async fn test_hydration_runs_once() {
        let store = Store::in_memory();
        let sync = Reconciler::new(
            store.clone(),
            Arc::new(MockRemote {
                weights: vec![weight("w1", 80.0)],
                ..MockRemote::default()
            }),
            "u1",
        );

        sync.hydrate().await;
        store.remove_weight("w1");
        // A second hydrate must not re-apply the remote snapshot.
        sync.hydrate().await;
        assert!(store.weights().is_empty());
    }

    #[tokio::test]
    async fn test_hydration_failure_keeps_local_state() {
        let store = Store::in_memory();
        store.add_weight(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(), 80.0);

        let sync = Reconciler::new(
            store.clone(),
            Arc::new(MockRemote {
                fail_loads: true,
                weights: vec![weight("w9", 99.0)],
                ..MockRemote::default()
            }),
            "u1",
        );
        sync.hydrate().await;

        assert_eq!(sync.state(), SyncState::Live);
        assert_eq!(store.weights().len(), 1);
        assert!((store.weights()[0].weight_kg - 80.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_pending_local_edit_not_clobbered_by_same_length_remote() {
        let store = Store::in_memory();
        let entry_a = diary_entry("d1", "Chicken");
        let entry_b = diary_entry("d2", "Rice");
        let remote = Arc::new(MockRemote {
            diary: vec![entry_a.clone(), entry_b.clone()],
            ..MockRemote::default()
        });
        let sync = Reconciler::new(store.clone(), remote, "u1");
        sync.hydrate().await;

        // Local edit after hydration: local != last-synced.
        let mut edited = entry_b.clone();
        edited.quantity = 2.5;
        store.update_diary_entry(edited.clone());

        // Remote delivers a same-length list with different content.
        let mut conflicting = entry_b;
        conflicting.quantity = 9.0;
        sync.apply_remote(RemoteChange::Diary(vec![entry_a, conflicting]));

        let diary = store.diary();
        let kept = diary.iter().find(|d| d.id == "d2").unwrap();
        assert!((kept.quantity - 2.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_clean_local_state_accepts_longer_remote() {
        let store = Store::in_memory();
        let entry_a = diary_entry("d1", "Chicken");
        let remote = Arc::new(MockRemote {
            diary: vec![entry_a.clone()],
            ..MockRemote::default()
        });
        let sync = Reconciler::new(store.clone(), remote, "u1");
        sync.hydrate().await;

        let entry_b = diary_entry("d2", "Rice");
        sync.apply_remote(RemoteChange::Diary(vec![entry_a.clone(), entry_b.clone()]));
        assert_eq!(store.diary().len(), 2);

        // last-synced advanced with the application: replaying the same
        // snapshot is a no-op rather than a fresh apply.
        sync.apply_remote(RemoteChange::Diary(vec![entry_a, entry_b]));
        assert_eq!(store.diary().len(), 2);
    }

    #[tokio::test]
    async fn test_longer_remote_wins_even_with_pending_edits() {
        let store = Store::in_memory();
        let entry_a = diary_entry("d1", "Chicken");
        let remote = Arc::new(MockRemote {
            diary: vec![entry_a.clone()],
            ..MockRemote::default()
        });
        let sync = Reconciler::new(store.clone(), remote, "u1");
        sync.hydrate().await;

        let mut edited = entry_a.clone();
        edited.quantity = 3.0;
        store.update_diary_entry(edited);

        // Remote grew past last-synced: treated as a legitimate addition and
        // applied even though a local edit was pending.
        let entry_b = diary_entry("d2", "Rice");
        sync.apply_remote(RemoteChange::Diary(vec![entry_a, entry_b]));

        let diary = store.diary();
        assert_eq!(diary.len(), 2);
        assert!((diary.iter().find(|d| d.id == "d1").unwrap().quantity - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_empty_remote_never_wipes_foods() {
        let store = Store::in_memory();
        let remote = Arc::new(MockRemote {
            foods: vec![food("Remote Food")],
            ..MockRemote::default()
        });
        let sync = Reconciler::new(store.clone(), remote, "u1");
        sync.hydrate().await;
        assert_eq!(store.foods().len(), 1);

        sync.apply_remote(RemoteChange::Foods(vec![]));
        assert_eq!(store.foods().len(), 1);
    }

    #[tokio::test]
    async fn test_remote_profile_applies_and_rederives_targets() {
        let store = Store::in_memory();
        let sync = Reconciler::new(store.clone(), Arc::new(MockRemote::default()), "u1");
        sync.hydrate().await;

        sync.apply_remote(RemoteChange::Profile(Some(profile())));
        assert_eq!(store.targets().unwrap().calories, 2759);

        // Unchanged singleton is left alone; a vanished one is ignored.
        sync.apply_remote(RemoteChange::Profile(Some(profile())));
        sync.apply_remote(RemoteChange::Profile(None));
        assert!(store.profile().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounced_push_fires_after_quiet_period() {
        let store = Store::in_memory();
        let remote: Arc<MockRemote> = Arc::new(MockRemote::default());
        let sync = Reconciler::new(store.clone(), Arc::clone(&remote) as Arc<dyn RemoteStore>, "u1");
        sync.hydrate().await;
        sync.start();

        store.add_diary_entry(NewDiaryEntry {
            date: NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
            meal: MealType::Breakfast,
            food: food("Oats"),
            quantity: 1.0,
        });

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(remote.push_count.load(Ordering::SeqCst), 1);
        let pushed = remote
            .pushed_diary
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        assert_eq!(pushed[0].len(), 1);
        assert_eq!(pushed[0][0].food.name, "Oats");
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_edits_coalesce_into_one_push() {
        let store = Store::in_memory();
        let remote: Arc<MockRemote> = Arc::new(MockRemote::default());
        let sync = Reconciler::new(store.clone(), Arc::clone(&remote) as Arc<dyn RemoteStore>, "u1");
        sync.hydrate().await;
        sync.start();

        for i in 0..5 {
            store.add_weight(
                NaiveDate::from_ymd_opt(2024, 6, 10 + i).unwrap(),
                80.0 - f64::from(i),
            );
            tokio::time::sleep(Duration::from_millis(300)).await;
        }

        tokio::time::sleep(Duration::from_millis(1500)).await;
        // Each mutation landed inside the previous debounce window.
        assert_eq!(remote.push_count.load(Ordering::SeqCst), 1);

        // A later lone mutation schedules its own push.
        store.add_weight(NaiveDate::from_ymd_opt(2024, 6, 20).unwrap(), 75.0);
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(remote.push_count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_overlapping_push_is_suppressed() {
        let store = Store::in_memory();
        let gate = Arc::new(Notify::new());
        let remote: Arc<MockRemote> = Arc::new(MockRemote {
            push_gate: Some(Arc::clone(&gate)),
            ..MockRemote::default()
        });
        let sync = Arc::new(Reconciler::new(store.clone(), Arc::clone(&remote) as Arc<dyn RemoteStore>, "u1"));
        sync.hydrate().await;

        let first = {
            let sync = Arc::clone(&sync);
            tokio::spawn(async move { sync.push_now().await })
        };
        remote.push_started.notified().await;

        // While the first push is gated in flight, a second one bails out.
        sync.push_now().await;
        assert_eq!(remote.push_count.load(Ordering::SeqCst), 1);

        gate.notify_one();
        first.await.unwrap();
        assert_eq!(remote.push_count.load(Ordering::SeqCst), 1);

        // With the flag cleared, pushes work again.
        gate.notify_one();
        sync.push_now().await;
        assert_eq!(remote.push_count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_remote_change_skipped_while_push_in_flight() {
        let store = Store::in_memory();
        let gate = Arc::new(Notify::new());
        let remote: Arc<MockRemote> = Arc::new(MockRemote {
            push_gate: Some(Arc::clone(&gate)),
            ..MockRemote::default()
        });
        let sync = Arc::new(Reconciler::new(store.clone(), Arc::clone(&remote) as Arc<dyn RemoteStore>, "u1"));
        sync.hydrate().await;

        let push = {
            let sync = Arc::clone(&sync);
            tokio::spawn(async move { sync.push_now().await })
        };
        remote.push_started.notified().await;

        sync.apply_remote(RemoteChange::Diary(vec![diary_entry("d1", "Chicken")]));
        assert!(store.diary().is_empty());

        gate.notify_one();
        push.await.unwrap();
    }
}
