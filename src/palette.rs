use rand::seq::SliceRandom;

/// Colors a new booking may be drawn in.
pub const BOOKING_COLORS: [&str; 10] = [
    "#3B82F6", // blue
    "#EF4444", // red
    "#10B981", // green
    "#F59E0B", // yellow
    "#8B5CF6", // purple
    "#F97316", // orange
    "#06B6D4", // cyan
    "#84CC16", // lime
    "#EC4899", // pink
    "#6366F1", // indigo
];

/// Picks the display color for a newly created booking.
///
/// Each booking gets an independent draw. Bookings that belong to the same
/// logical event across several slots are not guaranteed to share a color.
pub trait ColorPalette: Send + Sync {
    fn pick_random(&self) -> String;
}

/// Uniform draw, with replacement, from [`BOOKING_COLORS`].
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultPalette;

impl ColorPalette for DefaultPalette {
    fn pick_random(&self) -> String {
        BOOKING_COLORS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(BOOKING_COLORS[0])
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_random_stays_in_palette() {
        let palette = DefaultPalette;
        for _ in 0..100 {
            let color = palette.pick_random();
            assert!(BOOKING_COLORS.contains(&color.as_str()), "{color}");
        }
    }
}
