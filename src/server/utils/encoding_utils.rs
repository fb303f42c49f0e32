use std::io::{Read, Write};

use flate2::{Compression, read::GzDecoder, write::GzEncoder};

/// compression we can speak in either direction
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContentEncoding {
    Zstd,
    Gzip,
    None,
}

impl ContentEncoding {
    /// pick what to send based on Accept-Encoding
    /// apple HLS player sends "gzip, deflate" or "identity" and identity MUST be respected:
    /// an explicit identity at least as preferred as any compression wins, `q=0` rules a
    /// coding out, ties go to zstd since it packs playlists better
    pub fn negotiate(accept_encoding: Option<&str>) -> Self {
        let Some(v) = accept_encoding else {
            return Self::None;
        };

        let offered: Vec<(String, f32)> = v.split(',').filter_map(Self::parse_coding).collect();

        let quality = |name: &str| -> Option<f32> {
            offered
                .iter()
                .find(|(coding, _)| coding == name)
                .or_else(|| offered.iter().find(|(coding, _)| coding == "*"))
                .map(|(_, q)| *q)
        };

        let candidates = [
            (Self::Zstd, quality("zstd").unwrap_or(0.0)),
            (Self::Gzip, quality("gzip").unwrap_or(0.0)),
        ];

        let Some((best, best_q)) = candidates
            .into_iter()
            .filter(|(_, q)| *q > 0.0)
            .fold(None, |acc: Option<(Self, f32)>, (encoding, q)| match acc {
                Some((_, acc_q)) if acc_q >= q => acc,
                _ => Some((encoding, q)),
            })
        else {
            return Self::None;
        };

        // only an identity the client actually named counts here, not a wildcard
        let identity_q = offered
            .iter()
            .find(|(coding, _)| coding == "identity")
            .map(|(_, q)| *q);

        match identity_q {
            Some(q) if q > 0.0 && q >= best_q => Self::None,
            _ => best,
        }
    }

    // "gzip;q=0.8" -> ("gzip", 0.8), a q that doesn't parse counts as not acceptable
    fn parse_coding(part: &str) -> Option<(String, f32)> {
        let mut pieces = part.split(';');
        let coding = pieces.next()?.trim().to_ascii_lowercase();
        if coding.is_empty() {
            return None;
        }

        let mut q = 1.0;
        for param in pieces {
            if let Some((key, value)) = param.split_once('=') {
                if key.trim().eq_ignore_ascii_case("q") {
                    q = value.trim().parse::<f32>().unwrap_or(0.0);
                }
            }
        }

        Some((coding, q))
    }

    /// what the upstream says it sent us
    pub fn from_content_encoding(content_encoding: Option<&str>) -> Self {
        match content_encoding.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("zstd") => Self::Zstd,
            Some("gzip") | Some("x-gzip") => Self::Gzip,
            _ => Self::None,
        }
    }

    pub fn as_header_value(&self) -> Option<&'static str> {
        match self {
            Self::Zstd => Some("zstd"),
            Self::Gzip => Some("gzip"),
            Self::None => None,
        }
    }

    pub fn compress(&self, data: &[u8]) -> Result<Vec<u8>, std::io::Error> {
        match self {
            Self::Zstd => zstd::encode_all(data, 3),
            Self::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(data)?;
                encoder.finish()
            }
            Self::None => Ok(data.to_vec()),
        }
    }

    pub fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, std::io::Error> {
        match self {
            Self::Zstd => zstd::decode_all(data),
            Self::Gzip => {
                let mut decoder = GzDecoder::new(data);
                let mut decompressed = Vec::new();
                decoder.read_to_end(&mut decompressed)?;
                Ok(decompressed)
            }
            Self::None => Ok(data.to_vec()),
        }
    }
}
