use std::{fmt, str::FromStr};

use serde::{
    de::{self, SeqAccess, Visitor},
    Deserialize,
};

use crate::{
    error::{Error, Result},
    random::Entropy,
};

/// An RGB colour with 0-255 channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Colours the polygon pattern picks from.
pub const PALETTE: [Rgb; 4] = [
    Rgb::new(100, 149, 237), // CornflowerBlue
    Rgb::new(205, 92, 92),   // IndianRed
    Rgb::new(0, 191, 255),   // DeepSkyBlue
    Rgb::new(112, 128, 144), // SlateGray
];

const NAMED: &[(&str, Rgb)] = &[
    ("black", Rgb::new(0, 0, 0)),
    ("white", Rgb::new(255, 255, 255)),
    ("red", Rgb::new(255, 0, 0)),
    ("green", Rgb::new(0, 128, 0)),
    ("blue", Rgb::new(0, 0, 255)),
    ("yellow", Rgb::new(255, 255, 0)),
    ("orange", Rgb::new(255, 165, 0)),
    ("purple", Rgb::new(160, 32, 240)),
    ("gray", Rgb::new(190, 190, 190)),
    ("grey", Rgb::new(190, 190, 190)),
    ("cornflowerblue", PALETTE[0]),
    ("indianred", PALETTE[1]),
    ("deepskyblue", PALETTE[2]),
    ("slategray", PALETTE[3]),
    ("slategrey", PALETTE[3]),
];

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Builds a colour from wide integers, rejecting any channel outside 0-255.
    pub fn from_channels(r: i64, g: i64, b: i64) -> Result<Self> {
        let channel = |name: &str, v: i64| {
            u8::try_from(v).map_err(|_| {
                Error::config(format!("{name} channel {v} is outside of 0-255"))
            })
        };
        Ok(Self::new(channel("red", r)?, channel("green", g)?, channel("blue", b)?))
    }

    /// Looks up a colour name, ignoring case.
    pub fn named(name: &str) -> Option<Self> {
        NAMED
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|&(_, rgb)| rgb)
    }

    /// Channels scaled to 0-1, linearized if the render target applies the sRGB curve itself.
    pub fn to_f32(self, linear: bool) -> [f32; 3] {
        let conv = |c: u8| {
            let c = f32::from(c) / 255.0;
            if !linear {
                c
            } else if c <= 0.04045 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        };
        [conv(self.r), conv(self.g), conv(self.b)]
    }
}

impl FromStr for Rgb {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if let Some(hex) = s.strip_prefix('#') {
            if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(Error::config(format!("invalid hex colour '{s}'")));
            }
            let digits = u32::from_str_radix(hex, 16)
                .map_err(|e| Error::config(format!("invalid hex colour '{s}': {e}")))?;
            let [_, r, g, b] = digits.to_be_bytes();
            return Ok(Self::new(r, g, b));
        }

        Self::named(s).ok_or_else(|| Error::config(format!("unknown colour name '{s}'")))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl<'a> Deserialize<'a> for Rgb {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'a>,
    {
        struct RgbVisitor;

        impl<'de> Visitor<'de> for RgbVisitor {
            type Value = Rgb;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("colour name, \"#rrggbb\" or [r, g, b]")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                v.parse().map_err(E::custom)
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut channels = [0i64; 3];
                for (i, channel) in channels.iter_mut().enumerate() {
                    *channel = seq
                        .next_element()?
                        .ok_or_else(|| de::Error::invalid_length(i, &self))?;
                }
                if seq.next_element::<de::IgnoredAny>()?.is_some() {
                    return Err(de::Error::invalid_length(4, &self));
                }
                let [r, g, b] = channels;
                Rgb::from_channels(r, g, b).map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_any(RgbVisitor)
    }
}

/// Draws each channel independently and uniformly over 0-255.
pub fn random_color(src: &mut impl Entropy) -> Rgb {
    Rgb::new(src.byte(), src.byte(), src.byte())
}
