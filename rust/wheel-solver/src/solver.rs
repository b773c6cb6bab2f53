//! Wheel constraint solver.
//!
//! For a class and a `(family, period, phase)` configuration, every
//! constrained position of the class implies one key value at one slot. The
//! configuration is infeasible when two positions imply different keys for
//! the same slot (a collision) or, under the Option-A policy, when an
//! additive family would need `K = 0` at a constrained position.
//!
//! A search tries every configuration of a [`SearchSpace`] per class and keeps
//! the one with the smallest rank key
//! `(option_a_violations, missing_slots, period, family_priority, phase)`.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

use wheel_core::{
    AddressTable, CipherFamily, ClassKey, Ciphertext, Classing, OptionAMode, OptionAPolicy,
    Provenance, Schedule, SearchSpace, WheelError,
};

use crate::constraints::{Constraint, ConstraintSet};

/// One class's cipher configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassConfig {
    pub family: CipherFamily,
    pub period: usize,
    pub phase: usize,
}

impl ClassConfig {
    pub fn new(family: CipherFamily, period: usize, phase: usize) -> Self {
        ClassConfig {
            family,
            period,
            phase,
        }
    }
}

impl fmt::Display for ClassConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/L={}/phase={}", self.family, self.period, self.phase)
    }
}

/// Why a configuration cannot hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Infeasibility {
    /// Two constrained positions share a slot but imply different keys.
    Collision {
        class: usize,
        slot: usize,
        first_position: usize,
        first_key: u8,
        second_position: usize,
        second_key: u8,
    },
    /// An additive family would pass plaintext through unchanged.
    OptionA {
        class: usize,
        position: usize,
        family: CipherFamily,
    },
    /// The search space offered nothing to try.
    EmptySearchSpace { class: usize },
}

impl Infeasibility {
    pub fn class(&self) -> usize {
        match self {
            Infeasibility::Collision { class, .. }
            | Infeasibility::OptionA { class, .. }
            | Infeasibility::EmptySearchSpace { class } => *class,
        }
    }
}

impl fmt::Display for Infeasibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Infeasibility::Collision {
                class,
                slot,
                first_position,
                first_key,
                second_position,
                second_key,
            } => write!(
                f,
                "collision in class {} slot {}: position {} needs K={} but position {} needs K={}",
                class, slot, first_position, first_key, second_position, second_key
            ),
            Infeasibility::OptionA {
                class,
                position,
                family,
            } => write!(
                f,
                "option-A: {} would need K=0 at position {} (class {})",
                family, position, class
            ),
            Infeasibility::EmptySearchSpace { class } => {
                write!(f, "no configurations to try for class {}", class)
            }
        }
    }
}

/// A feasible class configuration and the wheel it induces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSolution {
    pub class: usize,
    pub config: ClassConfig,
    pub key: ClassKey,
    pub option_a_violations: usize,
    pub constrained_positions: usize,
}

impl ClassSolution {
    pub fn missing_slots(&self) -> usize {
        self.key.wheel.missing_slots()
    }

    /// Lexicographic preference key; smaller is better.
    pub fn rank(&self, space: &SearchSpace) -> (usize, usize, usize, usize, usize) {
        (
            self.option_a_violations,
            self.missing_slots(),
            self.config.period,
            space.family_priority(self.config.family),
            self.config.phase,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassVerdict {
    Feasible(ClassSolution),
    Infeasible(Infeasibility),
}

impl ClassVerdict {
    pub fn is_feasible(&self) -> bool {
        matches!(self, ClassVerdict::Feasible(_))
    }
}

/// A schedule that satisfies every constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolvedSchedule {
    pub schedule: Schedule,
    pub configs: Vec<ClassConfig>,
    pub option_a_violations: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleVerdict {
    Feasible(SolvedSchedule),
    Infeasible { class: usize, reason: Infeasibility },
}

impl ScheduleVerdict {
    pub fn is_feasible(&self) -> bool {
        matches!(self, ScheduleVerdict::Feasible(_))
    }

    pub fn feasible(&self) -> Option<&SolvedSchedule> {
        match self {
            ScheduleVerdict::Feasible(s) => Some(s),
            ScheduleVerdict::Infeasible { .. } => None,
        }
    }

    pub fn into_feasible(self) -> Option<SolvedSchedule> {
        match self {
            ScheduleVerdict::Feasible(s) => Some(s),
            ScheduleVerdict::Infeasible { .. } => None,
        }
    }
}

/// Counters accumulated over a validate or search call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolveStats {
    pub configurations_tried: usize,
    pub feasible: usize,
    pub collisions: usize,
    pub option_a_rejections: usize,
}

impl SolveStats {
    fn record(&mut self, verdict: &ClassVerdict) {
        self.configurations_tried += 1;
        match verdict {
            ClassVerdict::Feasible(_) => self.feasible += 1,
            ClassVerdict::Infeasible(Infeasibility::Collision { .. }) => self.collisions += 1,
            ClassVerdict::Infeasible(Infeasibility::OptionA { .. }) => self.option_a_rejections += 1,
            ClassVerdict::Infeasible(Infeasibility::EmptySearchSpace { .. }) => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOutcome {
    pub verdict: ScheduleVerdict,
    pub stats: SolveStats,
}

/// Solver bound to one ciphertext, classing and constraint set.
///
/// Constraints must already live in the index space the wheels address
/// (see [`ConstraintSet::through`] when a permutation is in play).
pub struct Solver<'a> {
    ciphertext: &'a Ciphertext,
    table: AddressTable,
    by_class: Vec<Vec<&'a Constraint>>,
    policy: OptionAPolicy,
}

impl<'a> Solver<'a> {
    pub fn new(
        ciphertext: &'a Ciphertext,
        classing: Classing,
        constraints: &'a ConstraintSet,
        policy: OptionAPolicy,
    ) -> Result<Self, WheelError> {
        if constraints.text_len() != ciphertext.len() {
            return Err(WheelError::LengthMismatch {
                what: "constraint set",
                expected: ciphertext.len(),
                found: constraints.text_len(),
            });
        }
        let table = AddressTable::build(classing, ciphertext.len())?;
        let mut by_class = vec![Vec::new(); table.num_classes()];
        for c in constraints.iter() {
            by_class[table.class(c.position)].push(c);
        }
        Ok(Solver {
            ciphertext,
            table,
            by_class,
            policy,
        })
    }

    pub fn table(&self) -> &AddressTable {
        &self.table
    }

    pub fn num_classes(&self) -> usize {
        self.table.num_classes()
    }

    /// Derive the wheel for one class under one configuration.
    pub fn solve_class(&self, class: usize, config: ClassConfig) -> Result<ClassVerdict, WheelError> {
        let constraints = self.by_class.get(class).ok_or(WheelError::ClassOutOfRange {
            class,
            classes: self.num_classes(),
        })?;
        let mut key = ClassKey::new(config.family, config.period, config.phase)?;
        let mut owners: Vec<Option<(usize, u8)>> = vec![None; config.period];
        let mut option_a_violations = 0usize;
        let ct = self.ciphertext.symbols();

        for c in constraints {
            let slot = self.table.slot(c.position, config.period, config.phase);
            let k = config.family.solve_key(ct[c.position], c.plain);

            if self.policy.applies_to(c.source.is_anchor()) && config.family.is_pass_through(k) {
                match self.policy.mode {
                    OptionAMode::Reject => {
                        return Ok(ClassVerdict::Infeasible(Infeasibility::OptionA {
                            class,
                            position: c.position,
                            family: config.family,
                        }));
                    }
                    OptionAMode::Penalize => option_a_violations += 1,
                }
            }

            match owners[slot] {
                Some((first_position, first_key)) if first_key != k => {
                    return Ok(ClassVerdict::Infeasible(Infeasibility::Collision {
                        class,
                        slot,
                        first_position,
                        first_key,
                        second_position: c.position,
                        second_key: k,
                    }));
                }
                Some(_) => {}
                None => owners[slot] = Some((c.position, k)),
            }

            let provenance = if c.source.is_anchor() {
                Provenance::Forced
            } else {
                Provenance::Constrained
            };
            key.wheel.set(slot, k, provenance)?;
        }

        Ok(ClassVerdict::Feasible(ClassSolution {
            class,
            config,
            key,
            option_a_violations,
            constrained_positions: constraints.len(),
        }))
    }

    /// Check a fixed configuration for every class.
    pub fn validate(&self, configs: &[ClassConfig]) -> Result<SearchOutcome, WheelError> {
        if configs.len() != self.num_classes() {
            return Err(WheelError::LengthMismatch {
                what: "class configurations",
                expected: self.num_classes(),
                found: configs.len(),
            });
        }
        let mut stats = SolveStats::default();
        let mut keys = Vec::with_capacity(configs.len());
        let mut violations = 0usize;
        for (class, &config) in configs.iter().enumerate() {
            let verdict = self.solve_class(class, config)?;
            stats.record(&verdict);
            match verdict {
                ClassVerdict::Feasible(sol) => {
                    violations += sol.option_a_violations;
                    keys.push(sol.key);
                }
                ClassVerdict::Infeasible(reason) => {
                    debug!(class, %config, %reason, "fixed schedule infeasible");
                    return Ok(SearchOutcome {
                        verdict: ScheduleVerdict::Infeasible { class, reason },
                        stats,
                    });
                }
            }
        }
        let schedule = Schedule::new(self.table.classing(), keys)?;
        Ok(SearchOutcome {
            verdict: ScheduleVerdict::Feasible(SolvedSchedule {
                schedule,
                configs: configs.to_vec(),
                option_a_violations: violations,
            }),
            stats,
        })
    }

    /// Best configuration for one class, or the first reason every attempt failed.
    pub fn search_class(
        &self,
        class: usize,
        space: &SearchSpace,
        stats: &mut SolveStats,
    ) -> Result<ClassVerdict, WheelError> {
        let mut best: Option<ClassSolution> = None;
        let mut first_reason: Option<Infeasibility> = None;

        for &family in &space.families {
            for &period in &space.periods {
                if period == 0 {
                    continue;
                }
                for phase in space.phases_for(period) {
                    let config = ClassConfig::new(family, period, phase);
                    let verdict = self.solve_class(class, config)?;
                    stats.record(&verdict);
                    match verdict {
                        ClassVerdict::Feasible(sol) => {
                            let better = best
                                .as_ref()
                                .map(|b| sol.rank(space) < b.rank(space))
                                .unwrap_or(true);
                            if better {
                                best = Some(sol);
                            }
                        }
                        ClassVerdict::Infeasible(reason) => {
                            debug!(class, %config, %reason, "configuration rejected");
                            first_reason.get_or_insert(reason);
                        }
                    }
                }
            }
        }

        Ok(match best {
            Some(sol) => ClassVerdict::Feasible(sol),
            None => ClassVerdict::Infeasible(
                first_reason.unwrap_or(Infeasibility::EmptySearchSpace { class }),
            ),
        })
    }

    /// Search every class independently and assemble the best schedule.
    pub fn search(&self, space: &SearchSpace) -> Result<SearchOutcome, WheelError> {
        let mut stats = SolveStats::default();
        let mut keys = Vec::with_capacity(self.num_classes());
        let mut configs = Vec::with_capacity(self.num_classes());
        let mut violations = 0usize;

        for class in 0..self.num_classes() {
            match self.search_class(class, space, &mut stats)? {
                ClassVerdict::Feasible(sol) => {
                    info!(
                        class,
                        config = %sol.config,
                        missing = sol.missing_slots(),
                        constrained = sol.constrained_positions,
                        "class solved"
                    );
                    violations += sol.option_a_violations;
                    configs.push(sol.config);
                    keys.push(sol.key);
                }
                ClassVerdict::Infeasible(reason) => {
                    info!(class, %reason, "class infeasible under every configuration");
                    return Ok(SearchOutcome {
                        verdict: ScheduleVerdict::Infeasible { class, reason },
                        stats,
                    });
                }
            }
        }

        let schedule = Schedule::new(self.table.classing(), keys)?;
        Ok(SearchOutcome {
            verdict: ScheduleVerdict::Feasible(SolvedSchedule {
                schedule,
                configs,
                option_a_violations: violations,
            }),
            stats,
        })
    }
}
