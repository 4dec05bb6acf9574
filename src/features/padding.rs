// NovelCrab - GPL-3.0-or-later
// This file is part of NovelCrab.
//
// Copyright (C) 2025 Daniel Freiermuth
//
// NovelCrab is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// NovelCrab is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with NovelCrab.  If not, see <https://www.gnu.org/licenses/>.

//! Fixed-width alignment of feature sequences.
//!
//! Sequences are aligned to the right edge: short ones get sentinel values in
//! front, long ones lose their leading (oldest) values. The most recent values
//! always sit at the end of the vector.

/// Neutral value used for left padding
pub const PAD_VALUE: f64 = 0.0;

/// Left-pad or left-truncate `values` to exactly `len` entries
pub fn pad_left(values: &[f64], len: usize) -> Vec<f64> {
    if values.len() >= len {
        return values[values.len() - len..].to_vec();
    }

    let mut padded = vec![PAD_VALUE; len - values.len()];
    padded.extend_from_slice(values);
    padded
}
