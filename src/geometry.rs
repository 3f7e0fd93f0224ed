//! Microphone array geometry
//!
//! The text format is one header line followed by one microphone per line:
//!
//! ```text
//! id x y z
//! 0  0.035  0.000  0.0
//! 1  0.000  0.035  0.0
//! ```
//!
//! Coordinates are in metres. Every id in `[0, channels)` must appear exactly
//! once. Blank lines and lines starting with `#` are skipped.
//!
//! Parsing is a pure function from text to a validated [`MicArray`]; reading
//! the text from disk is left to the caller.

use crate::error::DoaError;

/// Validated microphone positions, indexed by channel
#[derive(Debug, Clone, PartialEq)]
pub struct MicArray {
    positions: Vec<[f32; 3]>,
}

impl MicArray {
    /// Build an array from positions indexed by channel
    ///
    /// # Errors
    ///
    /// Returns `DoaError::Configuration` if fewer than two microphones are
    /// given or any coordinate is not finite.
    pub fn new(positions: Vec<[f32; 3]>) -> Result<Self, DoaError> {
        if positions.len() < 2 {
            return Err(DoaError::Configuration(format!(
                "At least two microphones are required, got {}",
                positions.len()
            )));
        }

        if let Some(ch) = positions
            .iter()
            .position(|p| p.iter().any(|v| !v.is_finite()))
        {
            return Err(DoaError::Configuration(format!(
                "Microphone {} has a non-finite coordinate: {:?}",
                ch, positions[ch]
            )));
        }

        Ok(Self { positions })
    }

    /// Microphones evenly spaced on a horizontal circle, first one on +x
    pub fn circular(channels: usize, radius: f32) -> Result<Self, DoaError> {
        let step = 2.0 * std::f32::consts::PI / channels.max(1) as f32;
        Self::new(
            (0..channels)
                .map(|i| {
                    let angle = i as f32 * step;
                    [radius * angle.cos(), radius * angle.sin(), 0.0]
                })
                .collect(),
        )
    }

    /// Number of microphones
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Always false for a validated array
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Position of microphone `channel`
    pub fn position(&self, channel: usize) -> [f32; 3] {
        self.positions[channel]
    }

    /// All positions, indexed by channel
    pub fn positions(&self) -> &[[f32; 3]] {
        &self.positions
    }

    /// All unordered pairs `(i, j)` with `i < j`, in lexicographic order
    pub fn pairs(&self) -> Vec<(usize, usize)> {
        let n = self.positions.len();
        let mut pairs = Vec::with_capacity(n * (n - 1) / 2);
        for i in 0..n {
            for j in (i + 1)..n {
                pairs.push((i, j));
            }
        }
        pairs
    }

    /// Baseline vector from microphone `i` to microphone `j` (`x_j - x_i`)
    pub fn baseline(&self, i: usize, j: usize) -> [f32; 3] {
        let a = self.positions[i];
        let b = self.positions[j];
        [b[0] - a[0], b[1] - a[1], b[2] - a[2]]
    }

    /// Length of the longest baseline, in metres
    pub fn aperture(&self) -> f32 {
        self.pairs()
            .into_iter()
            .map(|(i, j)| {
                let d = self.baseline(i, j);
                (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt()
            })
            .fold(0.0, f32::max)
    }
}

/// Parse the text geometry format for an array of `channels` microphones
///
/// # Errors
///
/// Returns `DoaError::Configuration` for a malformed line, an id outside
/// `[0, channels)`, a duplicated id, or a missing id.
///
/// # Example
///
/// ```
/// use srp_doa::geometry::parse_geometry;
///
/// let text = "id x y z\n0 -0.05 0 0\n1 0.05 0 0\n";
/// let mics = parse_geometry(text, 2)?;
/// assert_eq!(mics.baseline(0, 1), [0.1, 0.0, 0.0]);
/// # Ok::<(), srp_doa::DoaError>(())
/// ```
pub fn parse_geometry(text: &str, channels: usize) -> Result<MicArray, DoaError> {
    let mut positions: Vec<Option<[f32; 3]>> = vec![None; channels];

    // First line is a header
    for (line_no, line) in text.lines().enumerate().skip(1) {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 4 {
            return Err(DoaError::Configuration(format!(
                "Line {}: expected `<id> <x> <y> <z>`, got {:?}",
                line_no + 1,
                line
            )));
        }

        let id: usize = fields[0].parse().map_err(|_| {
            DoaError::Configuration(format!(
                "Line {}: invalid microphone id {:?}",
                line_no + 1,
                fields[0]
            ))
        })?;

        if id >= channels {
            return Err(DoaError::Configuration(format!(
                "Line {}: microphone id {} out of range for {} channels",
                line_no + 1,
                id,
                channels
            )));
        }

        let mut coords = [0.0f32; 3];
        for (c, field) in coords.iter_mut().zip(&fields[1..]) {
            *c = field.parse().map_err(|_| {
                DoaError::Configuration(format!(
                    "Line {}: invalid coordinate {:?}",
                    line_no + 1,
                    field
                ))
            })?;
        }

        if positions[id].replace(coords).is_some() {
            return Err(DoaError::Configuration(format!(
                "Line {}: microphone id {} listed twice",
                line_no + 1,
                id
            )));
        }
    }

    let positions = positions
        .into_iter()
        .enumerate()
        .map(|(id, p)| {
            p.ok_or_else(|| {
                DoaError::Configuration(format!("Microphone id {} missing from geometry", id))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    log::debug!("Parsed geometry for {} microphones", positions.len());

    MicArray::new(positions)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: &str = "\
id x y z
0  0.02  0.02 0.0
1 -0.02  0.02 0.0
# back row
3  0.02 -0.02 0.0
2 -0.02 -0.02 0.0
";

    #[test]
    fn test_parse_square() {
        let mics = parse_geometry(SQUARE, 4).unwrap();
        assert_eq!(mics.len(), 4);
        assert_eq!(mics.position(2), [-0.02, -0.02, 0.0]);
        assert_eq!(mics.position(3), [0.02, -0.02, 0.0]);
    }

    #[test]
    fn test_out_of_range_id() {
        let err = parse_geometry(SQUARE, 3).unwrap_err();
        assert!(matches!(err, DoaError::Configuration(_)));
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_missing_id() {
        let err = parse_geometry(SQUARE, 5).unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_duplicate_id() {
        let text = "header\n0 0 0 0\n1 1 0 0\n0 0 1 0\n";
        let err = parse_geometry(text, 2).unwrap_err();
        assert!(err.to_string().contains("twice"));
    }

    #[test]
    fn test_malformed_lines() {
        assert!(parse_geometry("h\n0 0 0\n1 0 0 0\n", 2).is_err());
        assert!(parse_geometry("h\n0 0 0 zero\n1 0 0 0\n", 2).is_err());
        assert!(parse_geometry("h\n-1 0 0 0\n1 0 0 0\n", 2).is_err());
        assert!(parse_geometry("h\n0 0 0 NaN\n1 0 0 0\n", 2).is_err());
    }

    #[test]
    fn test_header_is_skipped() {
        // Header must not be parsed even if it looks like data
        let text = "0 9 9 9\n0 0 0 0\n1 0.1 0 0\n";
        let mics = parse_geometry(text, 2).unwrap();
        assert_eq!(mics.position(0), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_pairs_and_baselines() {
        let mics = parse_geometry(SQUARE, 4).unwrap();
        let pairs = mics.pairs();
        assert_eq!(pairs, vec![(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)]);
        assert_eq!(mics.baseline(0, 1), [-0.04, 0.0, 0.0]);
        assert!((mics.aperture() - 0.04 * 2f32.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_single_microphone_rejected() {
        assert!(MicArray::new(vec![[0.0; 3]]).is_err());
    }

    #[test]
    fn test_circular() {
        let mics = MicArray::circular(6, 0.05).unwrap();
        for p in mics.positions() {
            let r = (p[0] * p[0] + p[1] * p[1]).sqrt();
            assert!((r - 0.05).abs() < 1e-6);
        }
    }
}
