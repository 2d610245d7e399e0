use std::{
    array,
    ops::{Add, Mul, Sub},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct Vec<T, const N: usize>([T; N]);

impl<T: Copy> Vec<T, 2> {
    pub fn x(self) -> T {
        self.0[0]
    }

    pub fn y(self) -> T {
        self.0[1]
    }
}

impl<const N: usize> Vec<f32, N> {
    pub fn dot(self, other: Self) -> f32 {
        self.0.iter().zip(&other.0).map(|(&a, &b)| a * b).sum()
    }

    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Distance from `self` to the closest point of the segment `start..=end`.
    ///
    /// A degenerate segment (`start == end`) measures the distance to that point.
    pub fn dist_to_segment(self, start: Self, end: Self) -> f32 {
        let dir = end - start;
        let len_sq = dir.dot(dir);
        let t = if len_sq == 0.0 {
            0.0
        } else {
            ((self - start).dot(dir) / len_sq).clamp(0.0, 1.0)
        };
        (self - (start + dir * t)).length()
    }
}

pub type Vec2<T> = Vec<T, 2>;
pub type Vec2f = Vec2<f32>;

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
