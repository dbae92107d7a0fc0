use std::{
    array,
    ops::{Add, Mul, RangeInclusive, Sub},
};

use bytemuck::NoUninit;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct Vec<T, const N: usize>([T; N]);

impl<const N: usize> Vec<f32, N> {
    pub fn dist(self, other: Self) -> f32 {
        let mut sum = 0.0;
        for (&a, &b) in self.0.iter().zip(&other.0) {
            let diff = b - a;
            sum += diff * diff;
        }
        sum.sqrt()
    }
}

impl<T: Copy> Vec<T, 2> {
    pub fn x(self) -> T {
        self.0[0]
    }

    pub fn y(self) -> T {
        self.0[1]
    }
}

impl Vec2f {
    /// Unit vector pointing along `degrees`, measured counter-clockwise from +x.
    ///
    /// Quarter turns produce exact axis vectors instead of `cos`/`sin` rounding noise.
    pub fn from_heading(degrees: f32) -> Self {
        if degrees == 0.0 {
            vec2(1.0, 0.0)
        } else if degrees == 90.0 {
            vec2(0.0, 1.0)
        } else if degrees == 180.0 {
            vec2(-1.0, 0.0)
        } else if degrees == 270.0 {
            vec2(0.0, -1.0)
        } else {
            let (sin, cos) = degrees.to_radians().sin_cos();
            vec2(cos, sin)
        }
    }

    /// This vector rotated by 90° counter-clockwise.
    pub fn perp(self) -> Self {
        vec2(-self.y(), self.x())
    }

    /// This vector rotated counter-clockwise by `degrees`.
    pub fn rotate(self, degrees: f32) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        vec2(
            self.x() * cos - self.y() * sin,
            self.x() * sin + self.y() * cos,
        )
    }
}

// Safety: `[T; N]` has no padding iff `T` has no padding.
unsafe impl<T: NoUninit, const N: usize> NoUninit for Vec<T, N> {}

pub type Vec2<T> = Vec<T, 2>;
pub type Vec2f = Vec2<f32>;
pub type Vec2u = Vec2<u32>;

impl<T, const N: usize> Add<Vec<T, N>> for Vec<T, N>
where
    T: Add<Output = T> + Copy,
{
    type Output = Vec<T, N>;

    fn add(self, rhs: Vec<T, N>) -> Self::Output {
        Vec(array::from_fn(|i| self.0[i] + rhs.0[i]))
    }
}

impl<T, const N: usize> Sub<Vec<T, N>> for Vec<T, N>
where
    T: Sub<Output = T> + Copy,
{
    type Output = Vec<T, N>;

    fn sub(self, rhs: Vec<T, N>) -> Self::Output {
        Vec(array::from_fn(|i| self.0[i] - rhs.0[i]))
    }
}

impl<T, const N: usize> Mul<T> for Vec<T, N>
where
    T: Mul<Output = T> + Copy,
{
    type Output = Vec<T, N>;

    fn mul(self, rhs: T) -> Self::Output {
        Vec(array::from_fn(|i| self.0[i] * rhs))
    }
}

pub fn vec2<T>(x: T, y: T) -> Vec2<T> {
    Vec([x, y])
}

pub fn lerp<R>(range: RangeInclusive<R>, t: f32) -> R
where
    R: Copy + Add<R, Output = R> + Mul<f32, Output = R>,
{
    *range.start() * (1.0 - t) + *range.end() * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quarter_turns_are_exact() {
        assert_eq!(Vec2f::from_heading(0.0), vec2(1.0, 0.0));
        assert_eq!(Vec2f::from_heading(90.0), vec2(0.0, 1.0));
        assert_eq!(Vec2f::from_heading(180.0), vec2(-1.0, 0.0));
        assert_eq!(Vec2f::from_heading(270.0), vec2(0.0, -1.0));
    }

    #[test]
    fn diagonal_heading() {
        let dir = Vec2f::from_heading(45.0);
        assert!((dir.x() - dir.y()).abs() < 1e-6);
        assert!((dir.dist(vec2(0.0, 0.0)) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn perp_turns_left() {
        assert_eq!(vec2(1.0f32, 0.0).perp(), vec2(0.0, 1.0));
        assert_eq!(vec2(0.0f32, 1.0).perp(), vec2(-1.0, 0.0));
    }

    #[test]
    fn rotate_quarter() {
        let v = vec2(2.0f32, 0.0).rotate(90.0);
        assert!(v.dist(vec2(0.0, 2.0)) < 1e-5);
        let v = vec2(0.0f32, 1.0).rotate(-90.0);
        assert!(v.dist(vec2(1.0, 0.0)) < 1e-5);
    }

    #[test]
    fn lerp_midpoint() {
        let mid: Vec2f = lerp(vec2(0.0, 0.0)..=vec2(4.0, -2.0), 0.5);
        assert_eq!(mid, vec2(2.0, -1.0));
    }
}
