use glam::{Affine3A, Vec3};

/// Axis-aligned bounding box, used both for the local and the world frame.
///
/// The empty box has `min > max` so that unioning it with anything is a
/// no-op and `is_empty` stays cheap to test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::MAX),
        max: Vec3::splat(f32::MIN),
    };

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn is_empty(&self) -> bool {
        self.max.x < self.min.x
    }

    pub fn engulf_point(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    pub fn engulf(&mut self, other: &Aabb) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    pub fn diagonal(&self) -> f32 {
        self.min.distance(self.max)
    }

    pub fn midpoint(&self) -> Vec3 {
        0.5 * (self.min + self.max)
    }

    /// The box of the eight transformed corners.
    pub fn transformed(&self, m: &Affine3A) -> Aabb {
        let mut out = Aabb::EMPTY;
        for k in 0..8u32 {
            let p = Vec3::new(
                if k & 1 != 0 { self.max.x } else { self.min.x },
                if k & 2 != 0 { self.max.y } else { self.min.y },
                if k & 4 != 0 { self.max.z } else { self.min.z },
            );
            out.engulf_point(m.transform_point3(p));
        }
        out
    }
}

/// The largest column length of the linear part, used as the uniform scale
/// a transform applies to tessellation tolerances.
pub fn matrix_scale(m: &Affine3A) -> f32 {
    let sx = m.matrix3.x_axis.length();
    let sy = m.matrix3.y_axis.length();
    let sz = m.matrix3.z_axis.length();
    sx.max(sy).max(sz)
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use glam::vec3;

    #[test]
    fn empty_engulf() {
        let mut b = Aabb::EMPTY;
        assert!(b.is_empty());

        b.engulf_point(vec3(1.0, 2.0, 3.0));
        assert!(!b.is_empty());
        assert_eq!(b.min, vec3(1.0, 2.0, 3.0));
        assert_eq!(b.max, vec3(1.0, 2.0, 3.0));

        let mut other = Aabb::EMPTY;
        other.engulf(&b);
        assert_eq!(other, b);
    }

    #[test]
    fn transformed_rotates_corners() {
        let b = Aabb::new(vec3(-1.0, -2.0, -3.0), vec3(1.0, 2.0, 3.0));
        // Quarter turn about z swaps the x and y extents.
        let m = Affine3A::from_rotation_z(std::f32::consts::FRAC_PI_2);
        let t = b.transformed(&m);
        assert_relative_eq!(t.min.x, -2.0, epsilon = 1e-5);
        assert_relative_eq!(t.min.y, -1.0, epsilon = 1e-5);
        assert_relative_eq!(t.max.x, 2.0, epsilon = 1e-5);
        assert_relative_eq!(t.max.y, 1.0, epsilon = 1e-5);
        assert_relative_eq!(t.max.z, 3.0, epsilon = 1e-5);
    }

    #[test]
    fn scale_from_transform() {
        let m = Affine3A::from_scale(vec3(2.0, 0.5, 1.0));
        assert_relative_eq!(matrix_scale(&m), 2.0);
    }
}
