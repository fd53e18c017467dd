//! Open-hand geometry over the 21-point hand landmark topology.
//!
//! Landmark order: 0 wrist, 1-4 thumb (CMC, MCP, IP, tip), then four
//! points per finger (MCP, PIP, DIP, tip) for index, middle, ring, pinky.

pub const LANDMARK_COUNT: usize = 21;

const WRIST: usize = 0;
const THUMB_MCP: usize = 2;
const THUMB_IP: usize = 3;
const THUMB_TIP: usize = 4;

/// (tip, pip, mcp) for index, middle, ring, pinky
const FINGERS: [(usize, usize, usize); 4] = [(8, 6, 5), (12, 10, 9), (16, 14, 13), (20, 18, 17)];

/// Minimum tip-PIP-MCP angle for a finger to count as extended
const FINGER_EXTENDED_DEG: f32 = 160.0;
/// Minimum tip-IP-MCP angle for the thumb
const THUMB_EXTENDED_DEG: f32 = 135.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handedness {
    Left,
    Right,
}

impl Handedness {
    pub fn label(self) -> &'static str {
        match self {
            Handedness::Left => "Left",
            Handedness::Right => "Right",
        }
    }
}

/// Angle at `vertex` between the rays to `a` and `b`, in degrees.
pub fn joint_angle(a: Point, vertex: Point, b: Point) -> f32 {
    let v1 = (a.x - vertex.x, a.y - vertex.y);
    let v2 = (b.x - vertex.x, b.y - vertex.y);
    let norm = (v1.0.hypot(v1.1)) * (v2.0.hypot(v2.1));
    if norm <= f32::EPSILON {
        return 0.0;
    }
    let cosine = ((v1.0 * v2.0 + v1.1 * v2.1) / norm).clamp(-1.0, 1.0);
    cosine.acos().to_degrees()
}

fn is_finger_extended(landmarks: &[Point; LANDMARK_COUNT], tip: usize, pip: usize, mcp: usize) -> bool {
    joint_angle(landmarks[tip], landmarks[pip], landmarks[mcp]) > FINGER_EXTENDED_DEG
}

fn is_thumb_extended(landmarks: &[Point; LANDMARK_COUNT], handedness: Handedness) -> bool {
    let tip = landmarks[THUMB_TIP];
    let straight =
        joint_angle(tip, landmarks[THUMB_IP], landmarks[THUMB_MCP]) > THUMB_EXTENDED_DEG;

    // The thumb must also point away from the palm, which flips with the hand
    let direction = tip.x - landmarks[WRIST].x;
    match handedness {
        Handedness::Right => straight && direction < 0.0,
        Handedness::Left => straight && direction > 0.0,
    }
}

/// True when the thumb and all four fingers are extended.
pub fn is_hand_fully_open(landmarks: &[Point; LANDMARK_COUNT], handedness: Handedness) -> bool {
    is_thumb_extended(landmarks, handedness)
        && FINGERS
            .iter()
            .all(|&(tip, pip, mcp)| is_finger_extended(landmarks, tip, pip, mcp))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    fn p(x: f32, y: f32) -> Point {
        Point { x, y }
    }

    /// A right hand, palm facing the camera, fingers pointing up
    pub(crate) fn open_right_hand() -> [Point; LANDMARK_COUNT] {
        let mut lm = [p(0.0, 0.0); LANDMARK_COUNT];
        lm[WRIST] = p(0.5, 0.9);
        // thumb sweeps out to the left in image space
        lm[1] = p(0.44, 0.84);
        lm[THUMB_MCP] = p(0.38, 0.78);
        lm[THUMB_IP] = p(0.32, 0.72);
        lm[THUMB_TIP] = p(0.26, 0.66);
        for (i, x) in [0.42f32, 0.5, 0.58, 0.66].iter().enumerate() {
            let base = 5 + i * 4;
            lm[base] = p(*x, 0.7);
            lm[base + 1] = p(*x, 0.6);
            lm[base + 2] = p(*x, 0.5);
            lm[base + 3] = p(*x, 0.4);
        }
        lm
    }

    #[test]
    fn straight_joint_is_180_degrees() {
        let angle = joint_angle(p(0.0, 0.0), p(1.0, 0.0), p(2.0, 0.0));
        assert!((angle - 180.0).abs() < 1e-3);

        let angle = joint_angle(p(0.0, 1.0), p(0.0, 0.0), p(1.0, 0.0));
        assert!((angle - 90.0).abs() < 1e-3);
    }

    #[test]
    fn degenerate_joint_is_not_extended() {
        assert_eq!(joint_angle(p(1.0, 1.0), p(1.0, 1.0), p(2.0, 2.0)), 0.0);
    }

    #[test]
    fn open_right_hand_is_open() {
        assert!(is_hand_fully_open(&open_right_hand(), Handedness::Right));
    }

    #[test]
    fn thumb_direction_depends_on_handedness() {
        assert!(!is_hand_fully_open(&open_right_hand(), Handedness::Left));
    }

    #[test]
    fn curled_finger_closes_the_hand() {
        let mut lm = open_right_hand();
        // fold the middle fingertip back down toward the palm
        lm[12] = p(0.5, 0.68);
        assert!(!is_hand_fully_open(&lm, Handedness::Right));
    }
}
