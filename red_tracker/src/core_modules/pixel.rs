// THEORY (Single-Pixel Colour Heuristics):
// The `Pixel` module is the most fundamental unit of the detector. It wraps a single
// RGB sample and answers questions that need nothing but that sample: how bright it
// is, how saturated it is, and where it sits on the colour wheel.
//
// Hue, saturation and value follow the 8-bit HSV convention used by common vision
// toolkits, so colour thresholds tuned elsewhere carry over unchanged:
// - Hue:        degrees / 2, giving 0..=180 in a single byte
// - Saturation: chroma / value scaled to 0..=255 (zero for black)
// - Value:      max(R, G, B)
//
// Red sits on both ends of the hue circle, so "red" is described by two
// `HsvRange`s whose union is tested, never by a single range.

pub mod pixel {
    use image::Rgb;
    use serde::{Deserialize, Serialize};

    pub type Channel = u8;
    pub type Hue = u8;
    pub type SaturationHSV = u8;
    pub type ValueHSV = u8;

    /// A "dumb" data container representing a single RGB pixel.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Pixel {
        /// The red channel value (0-255).
        pub red: Channel,
        /// The green channel value (0-255).
        pub green: Channel,
        /// The blue channel value (0-255).
        pub blue: Channel,
    }

    impl Pixel {
        pub fn new(red: Channel, green: Channel, blue: Channel) -> Self {
            Self { red, green, blue }
        }

        /// Channels as floats, in RGB order, for statistical models.
        pub fn channels_f32(&self) -> [f32; 3] {
            [
                f32::from(self.red),
                f32::from(self.green),
                f32::from(self.blue),
            ]
        }

        fn maximum_channel(&self) -> Channel {
            self.red.max(self.green.max(self.blue))
        }

        fn minimum_channel(&self) -> Channel {
            self.red.min(self.green.min(self.blue))
        }

        /// HSV Value (V): brightness defined as max(R, G, B).
        pub fn value_hsv(&self) -> ValueHSV {
            self.maximum_channel()
        }

        /// HSV Saturation scaled to 0..=255. Drops to zero for black, even if
        /// the hue is well-defined.
        pub fn saturation_hsv(&self) -> SaturationHSV {
            let value = self.maximum_channel();
            if value == 0 {
                return 0;
            }
            let chroma = f32::from(value - self.minimum_channel());
            (255.0 * chroma / f32::from(value)).round() as SaturationHSV
        }

        /// Hue in half-degrees, 0..=180.
        pub fn hue(&self) -> Hue {
            let maximum_channel = self.maximum_channel();
            let chroma = f32::from(maximum_channel - self.minimum_channel());
            if chroma == 0.0 {
                return 0;
            }

            let (red, green, blue) = (
                f32::from(self.red),
                f32::from(self.green),
                f32::from(self.blue),
            );
            let (base_difference, sector_offset) = if maximum_channel == self.red {
                (green - blue, 0.0)
            } else if maximum_channel == self.green {
                (blue - red, 120.0)
            } else {
                (red - green, 240.0)
            };

            let mut hue_degrees = 60.0 * base_difference / chroma + sector_offset;
            if hue_degrees < 0.0 {
                hue_degrees += 360.0;
            }
            (hue_degrees / 2.0).round() as Hue
        }

        pub fn to_hsv(&self) -> Hsv {
            Hsv {
                hue: self.hue(),
                saturation: self.saturation_hsv(),
                value: self.value_hsv(),
            }
        }
    }

    impl From<&Rgb<u8>> for Pixel {
        fn from(rgb: &Rgb<u8>) -> Self {
            let [red, green, blue] = rgb.0;
            Pixel::new(red, green, blue)
        }
    }

    impl From<Rgb<u8>> for Pixel {
        fn from(rgb: Rgb<u8>) -> Self {
            Pixel::from(&rgb)
        }
    }

    /// An 8-bit HSV triple.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Hsv {
        pub hue: Hue,
        pub saturation: SaturationHSV,
        pub value: ValueHSV,
    }

    impl Hsv {
        pub const fn new(hue: Hue, saturation: SaturationHSV, value: ValueHSV) -> Self {
            Self {
                hue,
                saturation,
                value,
            }
        }
    }

    /// An inclusive box in HSV space.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct HsvRange {
        pub lower: Hsv,
        pub upper: Hsv,
    }

    impl HsvRange {
        pub const fn new(lower: Hsv, upper: Hsv) -> Self {
            Self { lower, upper }
        }

        pub fn contains(&self, hsv: &Hsv) -> bool {
            (self.lower.hue..=self.upper.hue).contains(&hsv.hue)
                && (self.lower.saturation..=self.upper.saturation).contains(&hsv.saturation)
                && (self.lower.value..=self.upper.value).contains(&hsv.value)
        }
    }

    /// Low end of the hue circle.
    pub const RED_LOW_RANGE: HsvRange =
        HsvRange::new(Hsv::new(0, 120, 70), Hsv::new(10, 255, 255));
    /// High end of the hue circle, wrapping back to red.
    pub const RED_HIGH_RANGE: HsvRange =
        HsvRange::new(Hsv::new(170, 120, 70), Hsv::new(180, 255, 255));
}
