//! Wheels and schedules.
//!
//! A wheel holds one optional key per slot of its period. A slot, once set,
//! only accepts the same value again: a differing write is a conflict, never
//! a silent overwrite. Each filled slot also records where its key came from
//! so null samples know which slots to hold and which to redraw.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::classing::{AddressTable, Classing};
use crate::error::WheelError;
use crate::family::CipherFamily;
use crate::ALPHABET_SIZE;

/// Origin of a wheel key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Solved from an anchor position.
    Forced,
    /// Solved from an externally supplied, non-anchor constraint.
    Constrained,
    /// Supplied by the caller or drawn at random.
    Free,
}

impl Provenance {
    /// Held slots keep their key across null samples.
    pub fn is_held(self) -> bool {
        matches!(self, Provenance::Forced | Provenance::Constrained)
    }

    fn strength(self) -> u8 {
        match self {
            Provenance::Free => 0,
            Provenance::Constrained => 1,
            Provenance::Forced => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wheel {
    keys: Vec<Option<u8>>,
    provenance: Vec<Option<Provenance>>,
}

impl Wheel {
    pub fn new(period: usize) -> Result<Self, WheelError> {
        if period == 0 {
            return Err(WheelError::ZeroPeriod);
        }
        Ok(Wheel {
            keys: vec![None; period],
            provenance: vec![None; period],
        })
    }

    /// A fully populated wheel with every key marked `Free`.
    pub fn from_keys(keys: &[u8]) -> Result<Self, WheelError> {
        let mut wheel = Wheel::new(keys.len())?;
        for (slot, &k) in keys.iter().enumerate() {
            wheel.set(slot, k, Provenance::Free)?;
        }
        Ok(wheel)
    }

    pub fn period(&self) -> usize {
        self.keys.len()
    }

    /// Shape check for wheels that did not come through [`Wheel::new`].
    pub fn validate(&self) -> Result<(), WheelError> {
        if self.keys.is_empty() {
            return Err(WheelError::ZeroPeriod);
        }
        if self.provenance.len() != self.keys.len() {
            return Err(WheelError::LengthMismatch {
                what: "wheel provenance",
                expected: self.keys.len(),
                found: self.provenance.len(),
            });
        }
        Ok(())
    }

    pub fn get(&self, slot: usize) -> Option<u8> {
        self.keys.get(slot).copied().flatten()
    }

    pub fn provenance(&self, slot: usize) -> Option<Provenance> {
        self.provenance.get(slot).copied().flatten()
    }

    pub fn keys(&self) -> &[Option<u8>] {
        &self.keys
    }

    /// Fill `slot`. Rewriting the same key is a no-op; a different key is a conflict.
    ///
    /// When the same key arrives with a stronger provenance (Forced beats
    /// Constrained beats Free), the stronger one is kept.
    pub fn set(&mut self, slot: usize, key: u8, provenance: Provenance) -> Result<(), WheelError> {
        let period = self.period();
        let key = key % ALPHABET_SIZE;
        let entry = self
            .keys
            .get_mut(slot)
            .ok_or(WheelError::SlotOutOfRange { slot, period })?;
        let current = *entry;
        match current {
            Some(existing) if existing != key => Err(WheelError::SlotConflict {
                slot,
                existing,
                attempted: key,
            }),
            Some(_) => {
                let weaker = self.provenance[slot]
                    .map(|p| p.strength() < provenance.strength())
                    .unwrap_or(true);
                if weaker {
                    self.provenance[slot] = Some(provenance);
                }
                Ok(())
            }
            None => {
                *entry = Some(key);
                self.provenance[slot] = Some(provenance);
                Ok(())
            }
        }
    }

    pub fn filled(&self) -> usize {
        self.keys.iter().filter(|k| k.is_some()).count()
    }

    pub fn missing_slots(&self) -> usize {
        self.period() - self.filled()
    }

    pub fn is_complete(&self) -> bool {
        self.keys.iter().all(Option::is_some)
    }

    pub fn first_missing(&self) -> Option<usize> {
        self.keys.iter().position(Option::is_none)
    }

    /// Copy of this wheel with held slots kept and every other slot drawn from `draw`.
    pub fn redraw_free(&self, draw: &mut impl FnMut() -> u8) -> Wheel {
        let mut wheel = self.clone();
        for (key, provenance) in wheel.keys.iter_mut().zip(wheel.provenance.iter_mut()) {
            if !provenance.map(Provenance::is_held).unwrap_or(false) {
                *key = Some(draw() % ALPHABET_SIZE);
                *provenance = Some(Provenance::Free);
            }
        }
        wheel
    }

    /// Copy with the same keys and every filled slot marked `Free`.
    pub fn released(&self) -> Wheel {
        Wheel {
            keys: self.keys.clone(),
            provenance: self.keys.iter().map(|k| k.map(|_| Provenance::Free)).collect(),
        }
    }

    fn fill_empty(&mut self, mut fill: impl FnMut(usize) -> u8) {
        let slots = self.keys.iter_mut().zip(self.provenance.iter_mut());
        for (slot, (key, provenance)) in slots.enumerate() {
            if key.is_none() {
                *key = Some(fill(slot) % ALPHABET_SIZE);
                *provenance = Some(Provenance::Free);
            }
        }
    }
}

/// Per-class key material: family, phase and the wheel (whose length is the period).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassKey {
    pub family: CipherFamily,
    pub phase: usize,
    pub wheel: Wheel,
}

impl ClassKey {
    pub fn new(family: CipherFamily, period: usize, phase: usize) -> Result<Self, WheelError> {
        Ok(ClassKey {
            family,
            phase,
            wheel: Wheel::new(period)?,
        })
    }

    pub fn period(&self) -> usize {
        self.wheel.period()
    }
}

/// One anchor-derived key: `(class, residue, key)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForcedSlot {
    pub class: usize,
    pub residue: usize,
    pub key: u8,
}

/// A slot where a schedule's key differs from the one the anchors require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotDisagreement {
    pub class: usize,
    pub slot: usize,
    pub expected: u8,
    pub found: Option<u8>,
}

impl fmt::Display for SlotDisagreement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.found {
            Some(k) => write!(
                f,
                "class {} slot {} holds K={} but the anchors require K={}",
                self.class, self.slot, k, self.expected
            ),
            None => write!(
                f,
                "class {} slot {} is empty but the anchors require K={}",
                self.class, self.slot, self.expected
            ),
        }
    }
}

/// The full key under test: a classing plus one `ClassKey` per class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub classing: Classing,
    pub classes: Vec<ClassKey>,
}

impl Schedule {
    pub fn new(classing: Classing, classes: Vec<ClassKey>) -> Result<Self, WheelError> {
        let schedule = Schedule { classing, classes };
        schedule.validate()?;
        Ok(schedule)
    }

    /// Shape check for schedules read from outside, e.g. a candidate file.
    pub fn validate(&self) -> Result<(), WheelError> {
        self.classing.validate()?;
        if self.classes.len() != self.classing.num_classes() {
            return Err(WheelError::LengthMismatch {
                what: "schedule classes",
                expected: self.classing.num_classes(),
                found: self.classes.len(),
            });
        }
        for c in &self.classes {
            c.wheel.validate()?;
        }
        Ok(())
    }

    /// Key governing ciphertext position `i`, if its slot is filled.
    pub fn key_at(&self, table: &AddressTable, i: usize) -> Option<(CipherFamily, u8)> {
        let class_key = self.classes.get(table.class(i))?;
        let slot = table.slot(i, class_key.period(), class_key.phase);
        class_key.wheel.get(slot).map(|k| (class_key.family, k))
    }

    /// `(class, slot)` addressed by position `i`.
    pub fn address(&self, table: &AddressTable, i: usize) -> (usize, usize) {
        let class = table.class(i);
        let class_key = &self.classes[class];
        (class, table.slot(i, class_key.period(), class_key.phase))
    }

    pub fn is_complete(&self) -> bool {
        self.classes.iter().all(|c| c.wheel.is_complete())
    }

    pub fn missing_slots(&self) -> usize {
        self.classes.iter().map(|c| c.wheel.missing_slots()).sum()
    }

    /// First `(class, slot)` without a key, scanning classes in order.
    pub fn first_missing(&self) -> Option<(usize, usize)> {
        self.classes
            .iter()
            .enumerate()
            .find_map(|(class, c)| c.wheel.first_missing().map(|slot| (class, slot)))
    }

    /// Anchor-derived slots, in (class, residue) order.
    pub fn forced_slots(&self) -> Vec<ForcedSlot> {
        let mut out = Vec::new();
        for (class, c) in self.classes.iter().enumerate() {
            for residue in 0..c.period() {
                if c.wheel.provenance(residue) == Some(Provenance::Forced) {
                    if let Some(key) = c.wheel.get(residue) {
                        out.push(ForcedSlot { class, residue, key });
                    }
                }
            }
        }
        out
    }

    /// Fill every empty slot with `fill(class, slot)`, marking it `Free`.
    pub fn fill_missing(&mut self, mut fill: impl FnMut(usize, usize) -> u8) {
        for (class, c) in self.classes.iter_mut().enumerate() {
            c.wheel.fill_empty(|slot| fill(class, slot));
        }
    }

    /// Copy of this schedule whose held slots are exactly the held slots of `held`.
    ///
    /// Keys come from `self`; any provenance `self` carried is dropped. Every
    /// slot `held` holds must carry the same key here, otherwise the first
    /// disagreement in (class, slot) order is returned.
    pub fn hold_from(&self, held: &Schedule) -> Result<Schedule, SlotDisagreement> {
        let mut classes = Vec::with_capacity(self.classes.len());
        for (class, c) in self.classes.iter().enumerate() {
            let mut wheel = c.wheel.released();
            if let Some(h) = held.classes.get(class) {
                for slot in 0..h.period() {
                    let (Some(expected), Some(provenance)) = (h.wheel.get(slot), h.wheel.provenance(slot))
                    else {
                        continue;
                    };
                    if !provenance.is_held() {
                        continue;
                    }
                    match wheel.get(slot) {
                        Some(found) if found == expected => wheel.provenance[slot] = Some(provenance),
                        found => {
                            return Err(SlotDisagreement {
                                class,
                                slot,
                                expected,
                                found,
                            })
                        }
                    }
                }
            }
            classes.push(ClassKey {
                family: c.family,
                phase: c.phase,
                wheel,
            });
        }
        Ok(Schedule {
            classing: self.classing,
            classes,
        })
    }

    /// Copy with held slots kept and all others redrawn.
    pub fn redraw_free(&self, mut draw: impl FnMut() -> u8) -> Schedule {
        Schedule {
            classing: self.classing,
            classes: self
                .classes
                .iter()
                .map(|c| ClassKey {
                    family: c.family,
                    phase: c.phase,
                    wheel: c.wheel.redraw_free(&mut draw),
                })
                .collect(),
        }
    }
}
