//! Raid state machine: dispatch, encounter checks and completion.

use std::{sync::Arc, time::Duration};

use rand::Rng;
use tracing::{debug, info, warn};
use visceral_reclaimer_config::{LootItem, RaidOutcomeDef, RaidZoneDef};
use visceral_reclaimer_core::{
    ActionError, Cue, Dialog, Encounter, EncounterChoice, Event, InjurySeverity, LogTone,
    RaidOutcomeKind, RaidReport, RaidSnapshot, ResourceKind, SurvivorId, SurvivorStatus, ZoneId,
    ZoneOption,
};

use crate::{
    push_cue, push_log, reject,
    survivors::choose_mutation,
    timers::{TimerAction, TimerToken},
    World,
};

const ENCOUNTER_PLACEHOLDER: &str = "Anomaly detected! Stand by...";
const MISSING_OUTCOME_MESSAGE: &str = "System error retrieving outcome.";
const FIRST_CHECK_RANGE: (f64, f64) = (0.10, 0.25);
const CHECK_JITTER_RANGE: (f64, f64) = (0.8, 1.2);

#[derive(Clone, Debug)]
pub(crate) struct RaidState {
    zone: ZoneId,
    started_at: Duration,
    ends_at: Duration,
    duration: Duration,
    progress: f64,
    log: Vec<String>,
    paused: bool,
    paused_at: Option<Duration>,
    next_encounter_check: Duration,
    encounter: Option<Encounter>,
    auto_resolve: Option<TimerToken>,
}

impl RaidState {
    fn new(
        zone: ZoneId,
        zone_name: &str,
        now: Duration,
        duration: Duration,
        first_check: Duration,
    ) -> Self {
        Self {
            zone,
            started_at: now,
            ends_at: now + duration,
            duration,
            progress: 0.0,
            log: vec![format!("[0s] Dispatched to {zone_name}.")],
            paused: false,
            paused_at: None,
            next_encounter_check: now + first_check,
            encounter: None,
            auto_resolve: None,
        }
    }

    /// Time spent raiding, excluding pauses.
    fn active_elapsed(&self, now: Duration) -> Duration {
        self.duration
            .saturating_sub(self.ends_at.saturating_sub(now))
    }

    fn refresh_progress(&mut self, now: Duration) {
        if self.duration.is_zero() {
            self.progress = 1.0;
            return;
        }
        let fraction = self.active_elapsed(now).as_secs_f64() / self.duration.as_secs_f64();
        self.progress = fraction.clamp(0.0, 1.0);
    }

    fn record(&mut self, now: Duration, line: &str) {
        let stamp = self.active_elapsed(now).as_secs_f64().round();
        self.log.push(format!("[{stamp:.0}s] {line}"));
    }

    pub(crate) fn snapshot(&self, now: Duration) -> RaidSnapshot {
        let mut progress = self.progress;
        if !self.paused && self.duration > Duration::ZERO {
            let fraction = self.active_elapsed(now).as_secs_f64() / self.duration.as_secs_f64();
            progress = progress.max(fraction.clamp(0.0, 1.0));
        }
        RaidSnapshot {
            zone: self.zone.clone(),
            started_at: self.started_at,
            ends_at: self.ends_at,
            duration: self.duration,
            progress,
            paused: self.paused,
            encounter: self.encounter.clone(),
            next_encounter_check: self.next_encounter_check,
            log: self.log.clone(),
        }
    }

    pub(crate) fn pending_timer(&self) -> Option<TimerToken> {
        self.auto_resolve
    }
}

/// Draws an entry from the outcome table by cumulative probability.
///
/// A roll past the cumulative total, as happens with a malformed table, falls
/// back to the first `nothing` entry and then to the first entry.
pub(crate) fn select_outcome(table: &[RaidOutcomeDef], roll: f64) -> Option<&RaidOutcomeDef> {
    let mut cumulative = 0.0;
    for outcome in table {
        cumulative += outcome.chance;
        if roll < cumulative {
            return Some(outcome);
        }
    }
    table
        .iter()
        .find(|outcome| outcome.kind == RaidOutcomeKind::Nothing)
        .or_else(|| table.first())
}

/// Rolls each loot item after applying the zone's modifiers.
pub(crate) fn roll_loot<R: Rng>(
    items: &[LootItem],
    zone: Option<&RaidZoneDef>,
    rng: &mut R,
) -> Vec<(ResourceKind, u64)> {
    let mut granted = Vec::new();
    for item in items {
        let modifier = zone.map_or(1.0, |zone| zone.loot_modifier(item.resource));
        let min = (item.min * modifier).floor().max(0.0);
        let max = (item.max * modifier).ceil().max(min);
        if max <= 0.0 {
            continue;
        }
        let amount = rng.gen_range(min as u64..=max as u64);
        if amount > 0 {
            granted.push((item.resource, amount));
        }
    }
    granted
}

/// Health lost to an injury of the given severity.
pub(crate) fn injury_loss<R: Rng>(max_hp: f64, severity: InjurySeverity, rng: &mut R) -> f64 {
    let fraction = match severity {
        InjurySeverity::Minor => rng.gen_range(0.15..0.35),
        InjurySeverity::Major => rng.gen_range(0.5..0.8),
    };
    (max_hp * fraction).ceil()
}

/// Symmetric health jitter applied by a mutation outcome, in `[-10, 10)`.
pub(crate) fn mutation_jitter<R: Rng>(rng: &mut R) -> f64 {
    ((rng.gen::<f64>() - 0.5) * 20.0).floor()
}

fn uniform<R: Rng>(rng: &mut R, (low, high): (f64, f64)) -> f64 {
    if high > low {
        rng.gen_range(low..high)
    } else {
        low
    }
}

impl World {
    pub(crate) fn offer_raid_zones(&mut self, survivor: SurvivorId, out: &mut Vec<Event>) {
        let Some(index) = self.survivor_index(survivor) else {
            reject(out, ActionError::UnknownSurvivor, "Raid failed: unknown survivor.");
            return;
        };
        let entry = &self.survivors[index];
        if entry.status != SurvivorStatus::Idle {
            reject(
                out,
                ActionError::InvalidStatus {
                    status: entry.status,
                },
                format!("{} must be idle to raid (currently {}).", entry.name, entry.status),
            );
            return;
        }
        if self.config.raid_zones.is_empty() {
            reject(out, ActionError::NoRaidZones, "No raid zones are available.");
            return;
        }

        let zones = self
            .config
            .raid_zones
            .iter()
            .map(|(zone, def)| ZoneOption {
                zone: zone.clone(),
                name: def.name.clone(),
                description: def.description.clone(),
                min_duration_secs: def.duration_secs[0],
                max_duration_secs: def.duration_secs[1],
                loot_modifiers: def
                    .loot_modifiers
                    .iter()
                    .map(|(resource, modifier)| (*resource, *modifier))
                    .collect(),
            })
            .collect();
        out.push(Event::DialogRequested {
            dialog: Dialog::ZoneChoice { survivor, zones },
        });
    }

    pub(crate) fn dispatch_raid(
        &mut self,
        survivor: SurvivorId,
        zone: ZoneId,
        out: &mut Vec<Event>,
    ) {
        let config = Arc::clone(&self.config);
        let Some(index) = self.survivor_index(survivor) else {
            reject(out, ActionError::UnknownSurvivor, "Raid failed: unknown survivor.");
            return;
        };
        let entry = &self.survivors[index];
        if entry.status != SurvivorStatus::Idle {
            reject(
                out,
                ActionError::InvalidStatus {
                    status: entry.status,
                },
                format!("{} is no longer idle.", entry.name),
            );
            return;
        }
        let Some(zone_def) = config.raid_zones.get(&zone) else {
            reject(
                out,
                ActionError::UnknownZone,
                format!("Unknown raid zone {zone}."),
            );
            return;
        };

        let [min, max] = zone_def.duration_secs;
        let duration = Duration::from_secs_f64(uniform(&mut self.rng, (min, max)));
        let first_check = duration.mul_f64(uniform(&mut self.rng, FIRST_CHECK_RANGE));
        let now = self.clock;

        let entry = &mut self.survivors[index];
        entry.status = SurvivorStatus::Raiding;
        entry.raid = Some(RaidState::new(
            zone.clone(),
            &zone_def.name,
            now,
            duration,
            first_check,
        ));

        info!(
            survivor = survivor.get(),
            %zone,
            duration_secs = duration.as_secs_f64(),
            "raid dispatched"
        );
        push_log(
            out,
            LogTone::Raid,
            format!(
                "{} departs for {} (~{:.0}s).",
                entry.name,
                zone_def.name,
                duration.as_secs_f64()
            ),
        );
        push_cue(out, Cue::RaidStart);
        out.push(Event::RaidStarted {
            survivor,
            zone,
            duration,
        });
        out.push(Event::SurvivorChanged { survivor });
    }

    pub(crate) fn poll_raids(&mut self, out: &mut Vec<Event>) {
        let config = Arc::clone(&self.config);
        let interval = config.timing.encounter_check_interval();
        let auto_resolve_delay = config.timing.encounter_auto_resolve();
        let now = self.clock;
        let mut completed = Vec::new();

        for (index, entry) in self.survivors.iter_mut().enumerate() {
            if entry.status == SurvivorStatus::Dead {
                continue;
            }
            let Some(raid) = entry.raid.as_mut() else {
                continue;
            };
            if raid.paused {
                continue;
            }
            raid.refresh_progress(now);

            if entry.status == SurvivorStatus::Raiding && now >= raid.next_encounter_check {
                let chance = config
                    .raid_zones
                    .get(&raid.zone)
                    .map_or(0.1, |zone| zone.encounter_chance);
                if self.rng.gen::<f64>() < chance {
                    entry.status = SurvivorStatus::Paused;
                    raid.paused = true;
                    raid.paused_at = Some(now);
                    raid.record(now, "Encounter detected!");
                    let encounter = Encounter {
                        message: ENCOUNTER_PLACEHOLDER.to_owned(),
                    };
                    raid.encounter = Some(encounter.clone());
                    raid.auto_resolve = Some(self.timers.schedule(
                        now + auto_resolve_delay,
                        TimerAction::AutoResolveEncounter {
                            survivor: entry.id,
                        },
                    ));

                    debug!(survivor = entry.id.get(), "raid paused on encounter");
                    push_log(
                        out,
                        LogTone::Raid,
                        format!("{}'s raid halted: encounter detected!", entry.name),
                    );
                    push_cue(out, Cue::RaidEvent);
                    out.push(Event::DialogRequested {
                        dialog: Dialog::Message {
                            title: format!("Raid Event: {}", entry.name),
                            body: encounter.message.clone(),
                        },
                    });
                    out.push(Event::EncounterStarted {
                        survivor: entry.id,
                        encounter,
                    });
                    out.push(Event::SurvivorChanged { survivor: entry.id });
                } else {
                    let factor = uniform(&mut self.rng, CHECK_JITTER_RANGE);
                    raid.next_encounter_check = now + interval.mul_f64(factor);
                }
            }

            if entry.status == SurvivorStatus::Raiding && now >= raid.ends_at {
                completed.push(index);
            }
        }

        for index in completed {
            self.complete_raid(index, out);
        }
    }

    pub(crate) fn resolve_encounter(
        &mut self,
        survivor: SurvivorId,
        choice: EncounterChoice,
        out: &mut Vec<Event>,
    ) {
        let now = self.clock;
        let Some(index) = self.survivor_index(survivor) else {
            reject(
                out,
                ActionError::UnknownSurvivor,
                "Encounter resolution failed: unknown survivor.",
            );
            return;
        };
        let entry = &mut self.survivors[index];
        let Some(raid) = entry.raid.as_mut() else {
            warn!(
                survivor = survivor.get(),
                status = %entry.status,
                "encounter resolution requested without an active raid"
            );
            reject(
                out,
                ActionError::InvalidStatus {
                    status: entry.status,
                },
                format!("{} has no raid in progress.", entry.name),
            );
            return;
        };
        if let Some(token) = raid.auto_resolve.take() {
            if !self.timers.cancel(token) {
                debug!(survivor = survivor.get(), "auto-resolve timer already fired");
            }
        }

        if entry.status != SurvivorStatus::Paused || !raid.paused {
            warn!(
                survivor = survivor.get(),
                status = %entry.status,
                paused = raid.paused,
                "encounter resolution requested outside a paused raid; restoring raid state"
            );
            if let Some(paused_at) = raid.paused_at.take() {
                let paused_for = now.saturating_sub(paused_at);
                raid.ends_at += paused_for;
                raid.next_encounter_check += paused_for;
            }
            raid.paused = false;
            raid.encounter = None;
            entry.status = SurvivorStatus::Raiding;
            out.push(Event::SurvivorChanged { survivor });
            return;
        }

        let paused_for = raid
            .paused_at
            .take()
            .map_or(Duration::ZERO, |paused_at| now.saturating_sub(paused_at));
        raid.ends_at += paused_for;
        raid.next_encounter_check += paused_for;
        raid.paused = false;
        raid.encounter = None;
        raid.record(now, &format!("Encounter resolved: {}.", choice.label()));
        entry.status = SurvivorStatus::Raiding;

        push_log(
            out,
            LogTone::Raid,
            format!("{} presses on with the raid.", entry.name),
        );
        out.push(Event::EncounterResolved { survivor, choice });
        out.push(Event::SurvivorChanged { survivor });
    }

    /// Resolves an encounter whose auto-resolve timer fired.
    pub(crate) fn auto_resolve_encounter(
        &mut self,
        survivor: SurvivorId,
        token: TimerToken,
        out: &mut Vec<Event>,
    ) {
        let current = self
            .survivor_index(survivor)
            .and_then(|index| self.survivors[index].raid.as_ref())
            .and_then(RaidState::pending_timer);
        if current != Some(token) {
            debug!(survivor = survivor.get(), "stale encounter timer ignored");
            return;
        }
        self.resolve_encounter(survivor, EncounterChoice::Continue, out);
    }

    fn complete_raid(&mut self, index: usize, out: &mut Vec<Event>) {
        let config = Arc::clone(&self.config);
        let now = self.clock;
        let Some(entry) = self.survivors.get_mut(index) else {
            return;
        };
        let Some(mut raid) = entry.raid.take() else {
            return;
        };
        raid.progress = 1.0;

        let zone_def = config.raid_zones.get(&raid.zone);
        let zone_name = zone_def.map_or_else(|| raid.zone.to_string(), |def| def.name.clone());
        let roll = self.rng.gen::<f64>();
        let outcome = select_outcome(&config.raid_outcomes, roll);
        let kind = outcome.map_or(RaidOutcomeKind::Nothing, |outcome| outcome.kind);
        let message = outcome.map_or(MISSING_OUTCOME_MESSAGE, |outcome| outcome.message.as_str());

        let mut details: Vec<String> = Vec::new();
        let mut looted = false;
        match kind {
            RaidOutcomeKind::Loot => {
                let items = outcome.map_or(&[][..], |outcome| outcome.items.as_slice());
                for (resource, amount) in roll_loot(items, zone_def, &mut self.rng) {
                    self.ledger.grant(resource, amount as f64);
                    details.push(format!("+{amount} {}", resource.label()));
                    looted = true;
                }
                if !looted {
                    details.push("Nothing usable recovered.".to_owned());
                }
                entry.status = entry.settled_status();
            }
            RaidOutcomeKind::Nothing => {
                entry.status = entry.settled_status();
            }
            RaidOutcomeKind::Injury => {
                let severity = outcome.map_or(InjurySeverity::Minor, |outcome| outcome.severity);
                let loss = injury_loss(entry.max_hp, severity, &mut self.rng);
                entry.hp = (entry.hp - loss).max(1.0);
                entry.status = SurvivorStatus::Injured;
                details.push(format!(
                    "Lost {loss:.0} HP ({:.0}/{:.0}).",
                    entry.hp, entry.max_hp
                ));
            }
            RaidOutcomeKind::Mutation => {
                let available = entry.unowned_mutations(&config.mutations);
                if let Some(def) = choose_mutation(&available, &mut self.rng) {
                    entry.acquire_mutation(def);
                    details.push(format!("Gained {}.", def.name));
                }
                entry.status = SurvivorStatus::Mutated;
                let jitter = mutation_jitter(&mut self.rng);
                entry.hp = (entry.hp + jitter).clamp(1.0, entry.max_hp);
                details.push(format!("HP {:.0}/{:.0}.", entry.hp, entry.max_hp));
            }
            RaidOutcomeKind::Death => {
                entry.hp = 0.0;
                entry.status = SurvivorStatus::Dead;
            }
        }

        raid.record(now, &format!("Raid complete: {message}"));
        let mut summary = message.to_owned();
        for detail in &details {
            summary.push(' ');
            summary.push_str(detail);
        }

        let report = RaidReport {
            survivor: entry.id,
            survivor_name: entry.name.clone(),
            zone: raid.zone.clone(),
            zone_name: zone_name.clone(),
            duration_secs: raid.duration.as_secs_f64().round() as u64,
            outcome: kind,
            summary: summary.clone(),
            log: raid.log,
        };

        let (tone, cue) = match kind {
            RaidOutcomeKind::Loot | RaidOutcomeKind::Nothing => {
                (LogTone::Success, Cue::RaidSuccess)
            }
            RaidOutcomeKind::Mutation => (LogTone::Raid, Cue::RaidSuccess),
            RaidOutcomeKind::Injury => (LogTone::Warning, Cue::RaidFail),
            RaidOutcomeKind::Death => (LogTone::Danger, Cue::RaidFail),
        };
        info!(survivor = entry.id.get(), outcome = ?kind, "raid completed");
        push_log(
            out,
            tone,
            format!("{} returned from {zone_name}: {summary}", entry.name),
        );
        push_cue(out, cue);
        out.push(Event::DialogRequested {
            dialog: Dialog::Message {
                title: format!("Raid Complete: {} ({zone_name})", entry.name),
                body: format!("{summary}\n\n{}", report.log.join("\n")),
            },
        });
        out.push(Event::SurvivorChanged { survivor: entry.id });
        out.push(Event::RaidCompleted { report });
        if looted {
            self.push_resources(out);
        }
    }
}
