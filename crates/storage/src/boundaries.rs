//! Borough outline file: one `name:x,y x,y ...` entry per line.

use std::{collections::BTreeMap, fs, path::Path, str::FromStr};

use shared::error::LoadError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoroughBoundaries {
    outlines: BTreeMap<String, Vec<(f64, f64)>>,
}

impl BoroughBoundaries {
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let raw = fs::read_to_string(path).map_err(|err| LoadError::Boundaries {
            line: 0,
            message: format!("failed to read '{}': {err}", path.display()),
        })?;
        raw.parse()
    }

    pub fn outline(&self, borough: &str) -> Option<&[(f64, f64)]> {
        self.outlines.get(borough.trim()).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.outlines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outlines.is_empty()
    }
}

impl FromStr for BoroughBoundaries {
    type Err = LoadError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let mut outlines = BTreeMap::new();

        for (index, line) in raw.lines().enumerate() {
            let line_no = index + 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((name, coordinates)) = line.split_once(':') else {
                return Err(LoadError::Boundaries {
                    line: line_no,
                    message: "missing ':' between borough name and coordinates".into(),
                });
            };
            let name = name.trim();
            if name.is_empty() {
                return Err(LoadError::Boundaries {
                    line: line_no,
                    message: "empty borough name".into(),
                });
            }

            let points = coordinates
                .split(|c: char| c.is_whitespace() || c == ';')
                .filter(|pair| !pair.is_empty())
                .map(|pair| parse_point(pair, line_no))
                .collect::<Result<Vec<_>, _>>()?;
            if points.is_empty() {
                return Err(LoadError::Boundaries {
                    line: line_no,
                    message: format!("no coordinates for '{name}'"),
                });
            }

            outlines.insert(name.to_string(), points);
        }

        Ok(Self { outlines })
    }
}

fn parse_point(pair: &str, line: usize) -> Result<(f64, f64), LoadError> {
    let bad = || LoadError::Boundaries {
        line,
        message: format!("bad coordinate pair '{pair}'"),
    };
    let (x, y) = pair.split_once(',').ok_or_else(bad)?;
    let x = x.trim().parse::<f64>().map_err(|_| bad())?;
    let y = y.trim().parse::<f64>().map_err(|_| bad())?;
    Ok((x, y))
}
