// Twelve-tone rows.
//
// A row is a permutation of the 12 pitch classes, normalised so its prime
// form starts on 0 and transposed to the current key when sounded. The row
// is read in one of four forms:
//
//     P   prime               row[i]
//     R   retrograde          row[11 - i]
//     I   inversion           (12 - row[i]) mod 12
//     RI  retrograde-inverse  (12 - row[11 - i]) mod 12
//
// Consumers take 1–4 pitch classes at a time; a take never runs past the end
// of the row, so every pitch class sounds exactly once per pass. Finishing a
// pass picks a fresh form.

use std::fmt;

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::trace;

pub const ROW_LENGTH: u8 = 12;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RowForm {
    Prime,
    Retrograde,
    Inversion,
    RetrogradeInversion,
}

impl RowForm {
    pub const ALL: [RowForm; 4] = [
        RowForm::Prime,
        RowForm::Retrograde,
        RowForm::Inversion,
        RowForm::RetrogradeInversion,
    ];
}

impl fmt::Display for RowForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RowForm::Prime => "P",
            RowForm::Retrograde => "R",
            RowForm::Inversion => "I",
            RowForm::RetrogradeInversion => "RI",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToneRow {
    prime: [u8; 12],
    form: RowForm,
    position: u8,
}

impl ToneRow {
    /// Build a row from any ordering of the 12 pitch classes. Returns `None`
    /// if `order` is not a permutation.
    pub fn from_order(order: [u8; 12]) -> Option<Self> {
        let mut seen = [false; 12];
        for &pc in &order {
            let slot = seen.get_mut(usize::from(pc))?;
            if *slot {
                return None;
            }
            *slot = true;
        }
        let first = order[0];
        Some(Self {
            prime: order.map(|pc| (pc + 12 - first) % 12),
            form: RowForm::Prime,
            position: 0,
        })
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut order: [u8; 12] = std::array::from_fn(|i| i as u8);
        order.shuffle(rng);
        let mut row = Self::from_order(order).unwrap_or_else(Self::chromatic);
        row.form = RowForm::ALL[rng.random_range(0..RowForm::ALL.len())];
        row
    }

    fn chromatic() -> Self {
        Self {
            prime: std::array::from_fn(|i| i as u8),
            form: RowForm::Prime,
            position: 0,
        }
    }

    pub fn form(&self) -> RowForm {
        self.form
    }

    pub fn position(&self) -> u8 {
        self.position
    }

    /// Pitch class at `index` of the current form, before transposition.
    pub fn pitch_class_at(&self, index: u8) -> u8 {
        let i = usize::from(index % ROW_LENGTH);
        let pc = match self.form {
            RowForm::Prime | RowForm::Inversion => self.prime[i],
            RowForm::Retrograde | RowForm::RetrogradeInversion => self.prime[11 - i],
        };
        match self.form {
            RowForm::Inversion | RowForm::RetrogradeInversion => (12 - pc) % 12,
            _ => pc,
        }
    }

    /// Take up to `count` pitch classes transposed to `key`, stopping at the
    /// end of the row. Returns the starting position and the pitch classes.
    pub fn take<R: Rng + ?Sized>(&mut self, count: u8, key: u8, rng: &mut R) -> (u8, Vec<u8>) {
        let start = self.position;
        let end = start.saturating_add(count.max(1)).min(ROW_LENGTH);
        let pcs = (start..end).map(|i| (self.pitch_class_at(i) + key) % 12).collect();
        self.position = end;
        if self.position == ROW_LENGTH {
            self.position = 0;
            self.form = RowForm::ALL[rng.random_range(0..RowForm::ALL.len())];
            trace!(form = %self.form, "row restarts");
        }
        (start, pcs)
    }
}
