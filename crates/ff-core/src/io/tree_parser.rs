//! Parser for the policy tree syntax.
//!
//! ```text
//! TREE := "I" | "R" | "(" name ":" {[mult "*"] TREE}+ ")"
//! ```
//!
//! e.g. `(B: I 3*(C: I R) 2*R)`. Values are recomputed from the sensors, so
//! a tree printed from a built frontier parses back to the same numbers.

use std::collections::HashMap;
use std::sync::Arc;

use super::{is_sensor_name, ParseError};
use crate::engine::{Policy, PolicySignature, Sensor};

/// Parses trees over a fixed list of sensors.
#[derive(Debug, Clone)]
pub struct PolicyParser {
    sensors: Vec<Arc<Sensor>>,
    by_name: HashMap<String, usize>,
    inspect: PolicySignature,
}

struct Cursor<'a> {
    text: &'a str,
    pos: usize,
    /// Copies of each sensor used on the path from the root.
    used: Vec<usize>,
}

const SNIPPET: usize = 24;

impl PolicyParser {
    /// `overhead` is `E`; INSPECT leaves cost `1 + E` on good objects.
    pub fn new(sensors: &[Arc<Sensor>], overhead: f64) -> Result<Self, ParseError> {
        let mut by_name = HashMap::new();
        for (i, s) in sensors.iter().enumerate() {
            if by_name.insert(s.name().to_string(), i).is_some() {
                return Err(ParseError::new(
                    "sensor list",
                    Some(i),
                    s.name(),
                    format!("duplicate sensor name '{}'", s.name()),
                ));
            }
        }
        Ok(Self {
            sensors: sensors.to_vec(),
            by_name,
            inspect: PolicySignature::inspect(overhead),
        })
    }

    pub fn sensors(&self) -> &[Arc<Sensor>] {
        &self.sensors
    }

    /// Parses one complete tree; anything after it is an error.
    pub fn parse(&self, text: &str) -> Result<Policy, ParseError> {
        let mut cur = Cursor {
            text,
            pos: 0,
            used: vec![0; self.sensors.len()],
        };
        let policy = self.tree(&mut cur)?;
        cur.skip_ws();
        if cur.pos < text.len() {
            return Err(cur.error("unexpected input after the tree"));
        }
        Ok(policy)
    }

    fn tree(&self, cur: &mut Cursor<'_>) -> Result<Policy, ParseError> {
        cur.skip_ws();
        match cur.peek() {
            Some('R') if !cur.continues_word(1) => {
                cur.pos += 1;
                Ok(Policy::release())
            }
            Some('I') if !cur.continues_word(1) => {
                cur.pos += 1;
                Ok(Policy::inspect(self.inspect))
            }
            Some('(') => {
                cur.pos += 1;
                self.decision(cur)
            }
            Some(')') => Err(cur.error("unmatched ')'")),
            None => Err(cur.error("unexpected end of input, expected a tree")),
            Some(_) => Err(cur.error("expected 'I', 'R' or '('")),
        }
    }

    /// The part of `(name: children...)` after the opening parenthesis.
    fn decision(&self, cur: &mut Cursor<'_>) -> Result<Policy, ParseError> {
        cur.skip_ws();
        let name_start = cur.pos;
        let name = cur.word();
        if !is_sensor_name(name) {
            cur.pos = name_start;
            return Err(cur.error("expected a sensor name"));
        }
        let index = *self.by_name.get(name).ok_or_else(|| {
            ParseError::new("policy tree", Some(name_start), name, format!("unknown sensor '{}'", name))
        })?;
        let sensor = &self.sensors[index];
        if cur.used[index] >= sensor.copies() {
            return Err(ParseError::new(
                "policy tree",
                Some(name_start),
                name,
                format!(
                    "sensor '{}' is used more than {} time(s) along one path",
                    name,
                    sensor.copies()
                ),
            ));
        }
        cur.skip_ws();
        if cur.peek() != Some(':') {
            return Err(cur.error("expected ':' after the sensor name"));
        }
        cur.pos += 1;

        cur.used[index] += 1;
        let mut children = Vec::with_capacity(sensor.channel_count());
        loop {
            cur.skip_ws();
            match cur.peek() {
                Some(')') => {
                    cur.pos += 1;
                    break;
                }
                None => return Err(cur.error("missing ')'")),
                _ => {}
            }
            let mult_start = cur.pos;
            let mult = cur.multiplier()?;
            let room = sensor.channel_count() - children.len();
            if mult > room {
                return Err(ParseError::new(
                    "policy tree",
                    Some(mult_start),
                    cur.text[mult_start..cur.pos].trim_end(),
                    format!(
                        "sensor '{}' has {} channels but the tree gives more than {} children",
                        name,
                        sensor.channel_count(),
                        sensor.channel_count()
                    ),
                ));
            }
            let child = self.tree(cur)?;
            for _ in 1..mult {
                children.push(child.clone());
            }
            children.push(child);
        }
        cur.used[index] -= 1;

        if children.is_empty() {
            return Err(ParseError::new(
                "policy tree",
                Some(name_start),
                name,
                "a sensor node needs at least one child",
            ));
        }
        if children.len() != sensor.channel_count() {
            return Err(ParseError::new(
                "policy tree",
                Some(name_start),
                name,
                format!(
                    "sensor '{}' has {} channels but the tree gives {} children",
                    name,
                    sensor.channel_count(),
                    children.len()
                ),
            ));
        }
        Policy::from_children(Arc::clone(sensor), children)
            .map_err(|e| ParseError::new("policy tree", Some(name_start), name, e.to_string()))
    }
}

impl<'a> Cursor<'a> {
    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn skip_ws(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    /// Whether the character `offset` bytes ahead continues an identifier.
    fn continues_word(&self, offset: usize) -> bool {
        self.rest()[offset..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
    }

    fn word(&mut self) -> &'a str {
        let rest = self.rest();
        let len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    /// An optional `n*` prefix; 1 when absent.
    fn multiplier(&mut self) -> Result<usize, ParseError> {
        let rest = self.rest();
        let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
        if digits == 0 {
            return Ok(1);
        }
        let start = self.pos;
        let n = rest[..digits]
            .bytes()
            .try_fold(0usize, |n, d| n.checked_mul(10)?.checked_add(usize::from(d - b'0')))
            .ok_or_else(|| self.error("multiplier is too large"))?;
        self.pos += digits;
        self.skip_ws();
        if self.peek() != Some('*') {
            self.pos = start;
            return Err(self.error("expected '*' after a multiplier"));
        }
        self.pos += 1;
        if n == 0 {
            self.pos = start;
            return Err(self.error("multiplier must be positive"));
        }
        Ok(n)
    }

    fn error(&self, message: &str) -> ParseError {
        let snippet: String = self.rest().chars().take(SNIPPET).collect();
        ParseError::new("policy tree", Some(self.pos), snippet, message)
    }
}
