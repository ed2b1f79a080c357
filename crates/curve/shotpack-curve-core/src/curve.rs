//! Hermite-spline curves.
//!
//! Model:
//! - A curve owns a dense `Vec<Key>` sorted by time; two keys never share a time.
//! - Keys are addressed by index. Every mutation goes through the curve so the
//!   sort order and the tangents of affected neighbours stay consistent.
//! - Tangent Y values are stored pre-scaled by the adjacent segment duration,
//!   which lets evaluation run on the unit interval without rescaling.

use serde::{Deserialize, Serialize};

use crate::data::{Key, TangentMode, Vec2, STEPPED_SENTINEL};
use crate::interp::hermite;

/// Pivot used by `Auto` tangents when testing whether a key is a local extremum.
///
/// `Zero` compares neighbour deltas against 0. `LegacyOne` reproduces exports
/// made with the older tool, which compared against 1.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtremumPivot {
    #[default]
    Zero,
    LegacyOne,
}

impl ExtremumPivot {
    fn sign(self, delta: f64) -> i8 {
        let pivot = match self {
            ExtremumPivot::Zero => 0.0,
            ExtremumPivot::LegacyOne => 1.0,
        };
        if delta < pivot {
            -1
        } else if delta > pivot {
            1
        } else {
            0
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Curve {
    keys: Vec<Key>,
    pivot: ExtremumPivot,
}

impl Curve {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pivot(pivot: ExtremumPivot) -> Self {
        Self {
            keys: Vec::new(),
            pivot,
        }
    }

    pub fn pivot(&self) -> ExtremumPivot {
        self.pivot
    }

    /// Change the extremum pivot and recompute every key.
    pub fn set_pivot(&mut self, pivot: ExtremumPivot) {
        self.pivot = pivot;
        self.update_all_tangents();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    #[inline]
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&Key> {
        self.keys.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Key> {
        self.keys.iter()
    }

    /// Index of the key at exactly `time`.
    pub fn key_at(&self, time: f64) -> Option<usize> {
        self.search(time).ok()
    }

    /// Insert a key with `Auto` tangents. Returns `None` (and changes nothing)
    /// when a key already sits at `time`.
    pub fn insert_key_at(&mut self, time: f64, value: f64) -> Option<usize> {
        let index = self.insert_sorted(Key::new(time, value))?;
        self.refresh_around(index);
        Some(index)
    }

    /// Insert a fully specified key, as read back from persisted data.
    #[allow(clippy::too_many_arguments)]
    pub fn insert_key_with_tangents(
        &mut self,
        in_tangent: Vec2,
        time: f64,
        value: f64,
        out_tangent: Vec2,
        tangent_broken: bool,
        tangent_mode: TangentMode,
    ) -> Option<usize> {
        let key = Key {
            time,
            value,
            in_tangent,
            out_tangent,
            tangent_mode,
            tangent_broken,
        };
        let index = self.insert_sorted(key)?;
        self.refresh_around(index);
        Some(index)
    }

    pub fn set_value(&mut self, index: usize, value: f64) {
        if index >= self.keys.len() {
            return;
        }
        self.keys[index].value = value;
        self.refresh_around(index);
    }

    /// Move a key in time. Returns the key's new index, or `None` when the
    /// index is out of range or another key occupies `time`.
    pub fn set_time(&mut self, index: usize, time: f64) -> Option<usize> {
        let current = self.keys.get(index)?.time;
        if current == time {
            return Some(index);
        }
        if time.is_nan() || self.search(time).is_ok() {
            return None;
        }

        let mut affected = Vec::with_capacity(4);
        if index > 0 {
            affected.push(self.keys[index - 1].time);
        }
        if index + 1 < self.keys.len() {
            affected.push(self.keys[index + 1].time);
        }

        let mut key = self.keys.remove(index);
        key.time = time;
        let new_index = self.insert_sorted(key)?;
        if new_index > 0 {
            affected.push(self.keys[new_index - 1].time);
        }
        if new_index + 1 < self.keys.len() {
            affected.push(self.keys[new_index + 1].time);
        }
        affected.push(time);
        self.refresh_times(&affected);
        Some(new_index)
    }

    pub fn set_tangent_mode(&mut self, index: usize, mode: TangentMode) {
        if let Some(key) = self.keys.get_mut(index) {
            key.tangent_mode = mode;
            self.update_tangents(index);
        }
    }

    pub fn set_tangent_broken(&mut self, index: usize, broken: bool) {
        if let Some(key) = self.keys.get_mut(index) {
            key.tangent_broken = broken;
            self.update_tangents(index);
        }
    }

    /// Assign tangents by hand. The key switches to `User` mode so they are
    /// never recomputed.
    pub fn set_tangents(&mut self, index: usize, in_tangent: Vec2, out_tangent: Vec2) {
        if let Some(key) = self.keys.get_mut(index) {
            key.in_tangent = in_tangent;
            key.out_tangent = out_tangent;
            key.tangent_mode = TangentMode::User;
        }
    }

    /// Remove a key, handing it back so it can be restored with [`Curve::reinsert`].
    pub fn delete_key(&mut self, index: usize) -> Option<Key> {
        if index >= self.keys.len() {
            return None;
        }
        let key = self.keys.remove(index);
        if index > 0 {
            self.update_tangents(index - 1);
        }
        if index < self.keys.len() {
            self.update_tangents(index);
        }
        Some(key)
    }

    /// Undo of [`Curve::delete_key`]. `None` if the time has been taken since.
    pub fn reinsert(&mut self, key: Key) -> Option<usize> {
        let index = self.insert_sorted(key)?;
        self.refresh_around(index);
        Some(index)
    }

    /// Speed the animation up by `speed` (every time is divided by it).
    pub fn scale(&mut self, speed: f64) {
        debug_assert!(speed > 0.0, "curve scale requires a positive speed");
        self.retime(|t| t / speed);
    }

    /// Shift every key by `delta`.
    pub fn move_by(&mut self, delta: f64) {
        self.retime(|t| t + delta);
    }

    /// Drop keys outside `[start, end]`, keeping the last key at or before
    /// `start` and the first key at or after `end` so boundary segments keep
    /// their shape. Remaining tangents are not recomputed.
    pub fn trim(&mut self, start: f64, end: f64) {
        debug_assert!(start <= end, "trim range is inverted");
        let mut lo: Option<usize> = None;
        let mut hi = self.keys.len();
        for (i, key) in self.keys.iter().enumerate() {
            if lo.is_none() && key.time > start {
                lo = Some(i.saturating_sub(1));
            }
            if key.time >= end {
                hi = i + 1;
                break;
            }
        }
        // every key at or before start: only the last one survives
        let lo = lo.unwrap_or_else(|| self.keys.len().saturating_sub(1));
        self.keys.truncate(hi);
        self.keys.drain(..lo.min(self.keys.len()));
    }

    /// Hermite evaluation. Times outside the key range clamp to the boundary
    /// values; an empty curve evaluates to 0.
    pub fn evaluate(&self, time: f64) -> f64 {
        let (first, last) = match (self.keys.first(), self.keys.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return 0.0,
        };
        // NaN falls through to the first value as well.
        if !(time > first.time) {
            return first.value;
        }
        let right = self.keys.partition_point(|k| k.time <= time);
        if right >= self.keys.len() {
            return last.value;
        }
        let left = &self.keys[right - 1];
        let right = &self.keys[right];
        if left.out_tangent.y == STEPPED_SENTINEL {
            return left.value;
        }
        let t = (time - left.time) / (right.time - left.time);
        hermite(left.value, left.out_tangent.y, right.value, right.in_tangent.y, t)
    }

    /// Recompute the tangents of every key.
    pub fn update_all_tangents(&mut self) {
        for i in 0..self.keys.len() {
            self.update_tangents(i);
        }
    }

    /// Insert a key exactly as given, leaving every tangent untouched.
    /// `None` when the time is NaN or already occupied.
    pub(crate) fn insert_verbatim(&mut self, key: Key) -> Option<usize> {
        self.insert_sorted(key)
    }

    fn search(&self, time: f64) -> Result<usize, usize> {
        let i = self.keys.partition_point(|k| k.time < time);
        match self.keys.get(i) {
            Some(key) if key.time == time => Ok(i),
            _ => Err(i),
        }
    }

    fn insert_sorted(&mut self, key: Key) -> Option<usize> {
        if key.time.is_nan() {
            return None;
        }
        match self.search(key.time) {
            Ok(_) => None,
            Err(i) => {
                self.keys.insert(i, key);
                Some(i)
            }
        }
    }

    fn refresh_around(&mut self, index: usize) {
        if index > 0 {
            self.update_tangents(index - 1);
        }
        self.update_tangents(index);
        if index + 1 < self.keys.len() {
            self.update_tangents(index + 1);
        }
    }

    fn refresh_times(&mut self, times: &[f64]) {
        for &time in times {
            if let Ok(i) = self.search(time) {
                self.update_tangents(i);
            }
        }
    }

    /// Apply a strictly increasing time map one key at a time. Keys moving
    /// left are edited front to back, then keys moving right back to front,
    /// so no edit ever passes a neighbour that has not moved yet.
    fn retime(&mut self, map: impl Fn(f64) -> f64) {
        let targets: Vec<f64> = self.keys.iter().map(|k| map(k.time)).collect();
        for (i, &target) in targets.iter().enumerate() {
            if target < self.keys[i].time {
                self.retime_key(i, target);
            }
        }
        for (i, &target) in targets.iter().enumerate().rev() {
            if target > self.keys[i].time {
                self.retime_key(i, target);
            }
        }
    }

    fn retime_key(&mut self, index: usize, time: f64) {
        self.keys[index].time = time;
        debug_assert!(
            index == 0 || self.keys[index - 1].time < time,
            "retime passed the previous key"
        );
        debug_assert!(
            index + 1 >= self.keys.len() || time < self.keys[index + 1].time,
            "retime passed the next key"
        );
        self.refresh_around(index);
    }

    fn update_tangents(&mut self, index: usize) {
        let len = self.keys.len();
        let mode = self.keys[index].tangent_mode;
        match mode {
            TangentMode::User => return,
            TangentMode::Stepped => {
                // In-tangent is left alone so switching back restores it.
                self.keys[index].out_tangent = Vec2::new(0.0, STEPPED_SENTINEL);
                return;
            }
            TangentMode::Flat => {
                self.keys[index].in_tangent = Vec2::ZERO;
                self.keys[index].out_tangent = Vec2::ZERO;
                return;
            }
            TangentMode::Auto | TangentMode::Spline | TangentMode::Linear => {}
        }

        let first = index == 0;
        let last = index + 1 == len;
        if first && last {
            return;
        }

        let point = self.keys[index].point();
        let prev = (!first).then(|| self.keys[index - 1].point());
        let next = (!last).then(|| self.keys[index + 1].point());

        let (in_dir, out_dir) = match mode {
            TangentMode::Linear => linear_directions(point, prev, next),
            TangentMode::Spline => spline_directions(point, prev, next),
            _ => match (prev, next) {
                (Some(p), Some(n))
                    if self.pivot.sign(p.y - point.y) != self.pivot.sign(n.y - point.y) =>
                {
                    spline_directions(point, prev, next)
                }
                _ => (Vec2::ZERO, Vec2::ZERO),
            },
        };

        let key = &mut self.keys[index];
        key.in_tangent = match prev {
            Some(p) => rescale(in_dir, point.x - p.x),
            None => Vec2::ZERO,
        };
        key.out_tangent = match next {
            Some(n) => rescale(out_dir, n.x - point.x),
            None => Vec2::ZERO,
        };
    }
}

impl<'a> IntoIterator for &'a Curve {
    type Item = &'a Key;
    type IntoIter = std::slice::Iter<'a, Key>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.iter()
    }
}

fn linear_directions(point: Vec2, prev: Option<Vec2>, next: Option<Vec2>) -> (Vec2, Vec2) {
    let in_dir = prev.map_or(Vec2::ZERO, |p| {
        let d = Vec2::direction(point, p);
        Vec2::new(-d.x, d.y)
    });
    let out_dir = next.map_or(Vec2::ZERO, |n| Vec2::direction(point, n));
    (in_dir, out_dir)
}

fn spline_directions(point: Vec2, prev: Option<Vec2>, next: Option<Vec2>) -> (Vec2, Vec2) {
    match (prev, next) {
        (Some(p), Some(n)) => {
            let out_dir = Vec2::direction(p, n);
            (-out_dir, out_dir)
        }
        (None, Some(n)) => {
            let out_dir = Vec2::direction(point, n);
            (out_dir, out_dir)
        }
        (Some(p), None) => {
            let d = Vec2::direction(point, p);
            let in_dir = Vec2::new(-d.x, d.y);
            (in_dir, -in_dir)
        }
        (None, None) => (Vec2::ZERO, Vec2::ZERO),
    }
}

/// Scale a direction so its X component spans `delta`.
fn rescale(dir: Vec2, delta: f64) -> Vec2 {
    if dir.x == 0.0 {
        return dir;
    }
    dir.scaled(delta / dir.x)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve(keys: &[(f64, f64, TangentMode)]) -> Curve {
        let mut c = Curve::new();
        for &(t, v, mode) in keys {
            let i = c.insert_key_at(t, v).expect("free time");
            c.set_tangent_mode(i, mode);
        }
        c
    }

    #[test]
    fn linear_tangents_match_segment_slopes() {
        let c = curve(&[
            (0.0, 0.0, TangentMode::Linear),
            (2.0, 4.0, TangentMode::Linear),
            (3.0, 1.0, TangentMode::Linear),
        ]);
        let mid = &c.keys()[1];
        assert!((mid.in_tangent.y - 4.0).abs() < 1e-12);
        assert!((mid.in_tangent.x - 2.0).abs() < 1e-12);
        assert!((mid.out_tangent.y + 3.0).abs() < 1e-12);
        assert_eq!(c.keys()[0].in_tangent, Vec2::ZERO);
        assert_eq!(c.keys()[2].out_tangent, Vec2::ZERO);
    }

    #[test]
    fn spline_uses_neighbour_chord() {
        let c = curve(&[
            (0.0, 0.0, TangentMode::Spline),
            (1.0, 1.0, TangentMode::Spline),
            (3.0, 4.0, TangentMode::Spline),
        ]);
        // chord slope (4 - 0) / 3, scaled by each adjacent segment
        let mid = &c.keys()[1];
        assert!((mid.in_tangent.y - 4.0 / 3.0).abs() < 1e-12);
        assert!((mid.out_tangent.y - 8.0 / 3.0).abs() < 1e-12);
        // boundary keys mirror their single neighbour, missing side zero
        assert!((c.keys()[0].out_tangent.y - 1.0).abs() < 1e-12);
        assert_eq!(c.keys()[0].in_tangent, Vec2::ZERO);
        assert!((c.keys()[2].in_tangent.y - 3.0).abs() < 1e-12);
        assert_eq!(c.keys()[2].out_tangent, Vec2::ZERO);
    }

    #[test]
    fn legacy_pivot_changes_auto_classification() {
        let keys = [
            (0.0, 0.0, TangentMode::Auto),
            (1.0, 0.5, TangentMode::Auto),
            (2.0, 1.0, TangentMode::Auto),
        ];
        let zero = curve(&keys);
        assert!(zero.keys()[1].out_tangent.y > 0.0);

        let mut legacy = curve(&keys);
        legacy.set_pivot(ExtremumPivot::LegacyOne);
        // both deltas (-0.5, 0.5) are below 1, so the key flattens
        assert_eq!(legacy.keys()[1].out_tangent, Vec2::ZERO);
    }

    #[test]
    fn set_time_resorts_and_refreshes_neighbours() {
        let mut c = curve(&[
            (0.0, 0.0, TangentMode::Linear),
            (1.0, 1.0, TangentMode::Linear),
            (2.0, 0.0, TangentMode::Linear),
            (3.0, 2.0, TangentMode::Linear),
        ]);
        let moved = c.set_time(1, 2.5).expect("free time");
        assert_eq!(moved, 2);
        let times: Vec<f64> = c.iter().map(|k| k.time).collect();
        assert_eq!(times, vec![0.0, 2.0, 2.5, 3.0]);
        let mut fresh = c.clone();
        fresh.update_all_tangents();
        assert_eq!(fresh, c);
        assert_eq!(c.set_time(0, 3.0), None);
        assert_eq!(c.set_time(9, 4.0), None);
        assert_eq!(c.iter().map(|k| k.time).collect::<Vec<_>>(), times);
    }

    #[test]
    fn retime_keeps_order_for_mixed_sign_times() {
        let mut c = curve(&[
            (-2.0, 0.0, TangentMode::Auto),
            (-1.0, 1.0, TangentMode::Auto),
            (1.0, 0.0, TangentMode::Auto),
            (2.0, 1.0, TangentMode::Auto),
        ]);
        c.scale(0.5);
        let times: Vec<f64> = c.iter().map(|k| k.time).collect();
        assert_eq!(times, vec![-4.0, -2.0, 2.0, 4.0]);
        let mut fresh = c.clone();
        fresh.update_all_tangents();
        assert_eq!(fresh, c);
    }
}
