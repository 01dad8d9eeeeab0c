//! Plain text model files
//!
//! ```text
//! n <features>
//! m <fields>
//! k <latent dimension>
//! normalization <0|1>
//! w<feature>,<field> <k values>
//! ```
//!
//! with one `w` line per pair, feature-major and field-minor.
use crate::buffer::AlignedBuffer;
use crate::error::{FfmError, Result};
use crate::FieldAwareFactorizationMachine;
use linfa::Float;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Lines, Write};
use std::path::Path;

impl<F: Float> FieldAwareFactorizationMachine<F> {
    /// Write the model to `path`, replacing any existing file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Read a model written by [`save`](Self::save)
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::read_from(BufReader::new(File::open(path)?))
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writeln!(writer, "n {}", self.nfeatures())?;
        writeln!(writer, "m {}", self.nfields())?;
        writeln!(writer, "k {}", self.latent_dim())?;
        writeln!(writer, "normalization {}", self.normalization() as u8)?;
        for ((feature, field), values) in self.latent_vectors() {
            write!(writer, "w{},{}", feature, field)?;
            for v in values {
                write!(writer, " {}", v)?;
            }
            writeln!(writer)?;
        }
        Ok(())
    }

    pub fn read_from<R: BufRead>(reader: R) -> Result<Self> {
        let mut lines = NumberedLines {
            lines: reader.lines(),
            number: 0,
        };

        let nfeatures = header(lines.expect_line()?, "n")?;
        let nfields = header(lines.expect_line()?, "m")?;
        let latent_dim = header(lines.expect_line()?, "k")?;
        let normalization = match header(lines.expect_line()?, "normalization")? {
            0 => false,
            1 => true,
            other => {
                return Err(FfmError::Parse {
                    line: 4,
                    message: format!("normalization must be 0 or 1, found {}", other),
                })
            }
        };
        if latent_dim == 0 {
            return Err(FfmError::Parse {
                line: 3,
                message: "latent dimension must be bigger than 0".to_string(),
            });
        }

        let pairs = nfeatures
            .checked_mul(nfields)
            .filter(|pairs| pairs.checked_mul(latent_dim).is_some())
            .ok_or(FfmError::Allocation(usize::MAX))?;

        // grows with the lines actually present, not with the header
        let mut values = Vec::new();
        for pair in 0..pairs {
            let (line, text) = lines.expect_line()?;
            let mut tokens = text.split_whitespace();
            let label = format!("w{},{}", pair / nfields, pair % nfields);
            if tokens.next() != Some(label.as_str()) {
                return Err(FfmError::Parse {
                    line,
                    message: format!("expected weights of `{}`", label),
                });
            }
            let mut count = 0;
            for token in tokens {
                let value = F::from_str_radix(token, 10).map_err(|_| FfmError::Parse {
                    line,
                    message: format!("`{}` is not a number", token),
                })?;
                if count < latent_dim {
                    values.push(value);
                }
                count += 1;
            }
            if count != latent_dim {
                return Err(FfmError::Parse {
                    line,
                    message: format!("expected {} values, found {}", latent_dim, count),
                });
            }
        }

        while let Some((line, text)) = lines.next_line()? {
            if !text.trim().is_empty() {
                return Err(FfmError::Parse {
                    line,
                    message: "unexpected content after the last pair".to_string(),
                });
            }
        }

        Ok(FieldAwareFactorizationMachine::from_parts(
            nfeatures,
            nfields,
            latent_dim,
            normalization,
            AlignedBuffer::try_from_slice(&values)?,
        ))
    }
}

/// Lines of a model file, numbered from 1
struct NumberedLines<R> {
    lines: Lines<R>,
    number: usize,
}

impl<R: BufRead> NumberedLines<R> {
    fn next_line(&mut self) -> Result<Option<(usize, String)>> {
        match self.lines.next() {
            Some(line) => {
                self.number += 1;
                Ok(Some((self.number, line?)))
            }
            None => Ok(None),
        }
    }

    /// Like `next_line`, with the end of the file as a parse error
    fn expect_line(&mut self) -> Result<(usize, String)> {
        self.next_line()?.ok_or_else(|| FfmError::Parse {
            line: self.number + 1,
            message: "unexpected end of file".to_string(),
        })
    }
}

/// Parse a `<key> <unsigned integer>` header line
fn header((line, text): (usize, String), key: &str) -> Result<usize> {
    let mut tokens = text.split_whitespace();
    match (tokens.next(), tokens.next(), tokens.next()) {
        (Some(k), Some(value), None) if k == key => value.parse().map_err(|_| FfmError::Parse {
            line,
            message: format!("`{}` expects an unsigned integer, found `{}`", key, value),
        }),
        _ => Err(FfmError::Parse {
            line,
            message: format!("expected `{} <value>`", key),
        }),
    }
}
