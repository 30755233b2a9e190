use super::vec2::Vec2;

/// A directed segment from `begin` to `end`. Polygon sides are stored this way,
/// so for counter-clockwise polygons the outside is to the right of the direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSegment {
    pub begin: Vec2,
    pub end: Vec2,
}

impl LineSegment {
    pub fn new(begin: Vec2, end: Vec2) -> Self {
        Self { begin, end }
    }

    /// Calculates the length of the line segment.
    pub fn length(&self) -> f64 {
        self.begin.distance(self.end)
    }

    /// Calculates the squared length of the line segment.
    pub fn length_squared(&self) -> f64 {
        self.begin.distance_squared(self.end)
    }

    /// Returns the direction vector of the line segment (from begin to end).
    pub fn direction(&self) -> Vec2 {
        self.end - self.begin
    }

    pub fn normalized_direction(&self) -> Vec2 {
        self.direction().normalize()
    }

    /// Outward normal for a side of a counter-clockwise polygon.
    pub fn normal(&self) -> Vec2 {
        self.direction().normal()
    }

    pub fn midpoint(&self) -> Vec2 {
        self.begin.average(self.end)
    }

    pub fn points(&self) -> [Vec2; 2] {
        [self.begin, self.end]
    }

    /// Distance from the infinite line through this segment to `point`.
    /// When `signed`, points on the normal side come out positive.
    pub fn distance_to_point(&self, point: Vec2, signed: bool) -> f64 {
        let length = self.length();
        if length == 0.0 {
            return self.begin.distance(point);
        }
        let d = self.direction();
        let distance = (d.y * point.x - d.x * point.y + self.end.x * self.begin.y
            - self.end.y * self.begin.x)
            / length;
        if signed {
            distance
        } else {
            distance.abs()
        }
    }

    /// True when `point` is on the interior (left) side of the segment, or on it.
    pub fn below(&self, point: Vec2) -> bool {
        self.direction().cross(point - self.begin) >= 0.0
    }

    /// Clips the segment against the half plane `dot(p, direction) <= length`.
    /// `direction` must be normalized. Returns `None` unless two points survive.
    pub fn clip(&self, direction: Vec2, length: f64) -> Option<LineSegment> {
        let near = direction.dot(self.begin) - length;
        let far = direction.dot(self.end) - length;

        let mut kept: [Vec2; 2] = [Vec2::ZERO; 2];
        let mut count = 0;
        if near <= 0.0 {
            kept[count] = self.begin;
            count += 1;
        }
        if far <= 0.0 {
            kept[count] = self.end;
            count += 1;
        }
        if near * far < 0.0 && count < 2 {
            let t = near / (near - far);
            kept[count] = self.begin + (self.end - self.begin) * t;
            count += 1;
        }

        if count == 2 {
            Some(LineSegment::new(kept[0], kept[1]))
        } else {
            None
        }
    }

    /// Closest point on the segment to `point`.
    pub fn closest_point(&self, point: Vec2) -> Vec2 {
        let d = self.direction();
        let len_sq = d.magnitude_squared();
        if len_sq == 0.0 {
            return self.begin;
        }
        let t = ((point - self.begin).dot(d) / len_sq).clamp(0.0, 1.0);
        self.begin + d * t
    }
}
