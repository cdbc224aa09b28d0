//! Approximate state/territory lookup for a monitored point.
//!
//! Uses rectangular bounds, so points close to a border may resolve to the
//! neighbouring state. That only affects which state feed is fetched.

use emergency_watch_incident_models::AustralianState;

#[derive(Debug, Clone, Copy)]
struct Bounds {
    min_lat: f64,
    max_lat: f64,
    min_lon: f64,
    max_lon: f64,
}

impl Bounds {
    fn contains(&self, latitude: f64, longitude: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&latitude)
            && (self.min_lon..=self.max_lon).contains(&longitude)
    }
}

/// Checked in order. The ACT lies inside the NSW box, so it comes first.
const STATE_BOUNDS: [(AustralianState, Bounds); 8] = [
    (
        AustralianState::Act,
        Bounds {
            min_lat: -35.93,
            max_lat: -35.12,
            min_lon: 148.76,
            max_lon: 149.40,
        },
    ),
    (
        AustralianState::Nsw,
        Bounds {
            min_lat: -37.51,
            max_lat: -28.16,
            min_lon: 140.99,
            max_lon: 153.64,
        },
    ),
    (
        AustralianState::Vic,
        Bounds {
            min_lat: -39.16,
            max_lat: -33.98,
            min_lon: 140.96,
            max_lon: 149.98,
        },
    ),
    (
        AustralianState::Qld,
        Bounds {
            min_lat: -29.18,
            max_lat: -9.14,
            min_lon: 137.99,
            max_lon: 153.55,
        },
    ),
    (
        AustralianState::Sa,
        Bounds {
            min_lat: -38.06,
            max_lat: -25.99,
            min_lon: 129.00,
            max_lon: 141.00,
        },
    ),
    (
        AustralianState::Wa,
        Bounds {
            min_lat: -35.13,
            max_lat: -13.69,
            min_lon: 112.92,
            max_lon: 129.00,
        },
    ),
    (
        AustralianState::Tas,
        Bounds {
            min_lat: -43.74,
            max_lat: -39.57,
            min_lon: 143.82,
            max_lon: 148.50,
        },
    ),
    (
        AustralianState::Nt,
        Bounds {
            min_lat: -26.00,
            max_lat: -10.97,
            min_lon: 129.00,
            max_lon: 138.00,
        },
    ),
];

/// Resolves the state or territory whose feed covers `(latitude, longitude)`.
///
/// Returns `None` for points outside Australia.
#[must_use]
pub fn state_for_coordinates(latitude: f64, longitude: f64) -> Option<AustralianState> {
    STATE_BOUNDS
        .iter()
        .find(|(_, bounds)| bounds.contains(latitude, longitude))
        .map(|(state, _)| *state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capitals_resolve_to_their_state() {
        let cases = [
            (-33.8688, 151.2093, AustralianState::Nsw),
            (-37.8136, 144.9631, AustralianState::Vic),
            (-27.4698, 153.0251, AustralianState::Qld),
            (-34.9285, 138.6007, AustralianState::Sa),
            (-31.9505, 115.8605, AustralianState::Wa),
            (-42.8821, 147.3272, AustralianState::Tas),
            (-12.4634, 130.8456, AustralianState::Nt),
            (-23.6980, 133.8807, AustralianState::Nt),
        ];

        for (lat, lon, expected) in cases {
            assert_eq!(
                state_for_coordinates(lat, lon),
                Some(expected),
                "({lat}, {lon})"
            );
        }
    }

    #[test]
    fn act_wins_over_enclosing_nsw() {
        assert_eq!(
            state_for_coordinates(-35.2809, 149.1300),
            Some(AustralianState::Act)
        );
    }

    #[test]
    fn outside_australia_is_none() {
        assert_eq!(state_for_coordinates(-36.8485, 174.7633), None);
        assert_eq!(state_for_coordinates(51.5074, -0.1278), None);
    }
}
