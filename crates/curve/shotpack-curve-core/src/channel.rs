//! Channel naming: `uName` animates a scalar, `uName.x` .. `uName.w` animate
//! the components of a vector uniform.

use indexmap::map::Entry;
use indexmap::IndexMap;

use crate::curve::Curve;
use crate::error::CurveError;

const COMPONENTS: [&str; 4] = ["x", "y", "z", "w"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelName<'a> {
    pub uniform: &'a str,
    /// Vector component index (x = 0 .. w = 3), `None` for scalar channels.
    pub component: Option<usize>,
}

impl<'a> ChannelName<'a> {
    pub fn parse(name: &'a str) -> Result<Self, CurveError> {
        let malformed = || CurveError::MalformedChannel {
            name: name.to_string(),
        };
        let (uniform, component) = match name.rsplit_once('.') {
            Some((base, suffix)) => {
                let index = COMPONENTS
                    .iter()
                    .position(|c| *c == suffix)
                    .ok_or_else(malformed)?;
                (base, Some(index))
            }
            None => (name, None),
        };
        if !is_identifier(uniform) {
            return Err(malformed());
        }
        Ok(Self { uniform, component })
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// The curves animating one uniform, in component order.
#[derive(Clone, Debug)]
pub struct UniformChannels<'a> {
    pub uniform: &'a str,
    pub components: Vec<&'a Curve>,
}

impl UniformChannels<'_> {
    #[inline]
    pub fn element_count(&self) -> usize {
        self.components.len()
    }
}

enum Slots<'a> {
    Scalar(&'a Curve),
    Components([Option<&'a Curve>; 4]),
}

/// Group named channels by uniform, preserving first-seen order.
///
/// The element count of a vector uniform is its highest used component + 1;
/// every lower component must be present.
pub fn group_channels<'a, I>(channels: I) -> Result<Vec<UniformChannels<'a>>, CurveError>
where
    I: IntoIterator<Item = (&'a str, &'a Curve)>,
{
    let mut groups: IndexMap<&'a str, Slots<'a>> = IndexMap::new();
    for (name, curve) in channels {
        let parsed = ChannelName::parse(name)?;
        let inconsistent = |reason: &str| CurveError::InconsistentDimensions {
            uniform: parsed.uniform.to_string(),
            reason: reason.to_string(),
        };
        match (groups.entry(parsed.uniform), parsed.component) {
            (Entry::Vacant(slot), None) => {
                slot.insert(Slots::Scalar(curve));
            }
            (Entry::Vacant(slot), Some(i)) => {
                let mut components = [None; 4];
                components[i] = Some(curve);
                slot.insert(Slots::Components(components));
            }
            (Entry::Occupied(slot), Some(i)) => match slot.into_mut() {
                Slots::Components(components) if components[i].is_none() => {
                    components[i] = Some(curve);
                }
                Slots::Components(_) => {
                    return Err(inconsistent(&format!(
                        "component '{}' declared twice",
                        COMPONENTS[i]
                    )))
                }
                Slots::Scalar(_) => {
                    return Err(inconsistent("mixes scalar and component channels"))
                }
            },
            (Entry::Occupied(_), None) => {
                return Err(inconsistent("mixes scalar and component channels"))
            }
        }
    }

    let mut out = Vec::with_capacity(groups.len());
    for (uniform, slots) in groups {
        let components = match slots {
            Slots::Scalar(curve) => vec![curve],
            Slots::Components(slots) => {
                let used = slots.iter().rposition(Option::is_some).map_or(0, |i| i + 1);
                let mut components = Vec::with_capacity(used);
                for (i, slot) in slots[..used].iter().enumerate() {
                    match slot {
                        Some(curve) => components.push(*curve),
                        None => {
                            return Err(CurveError::InconsistentDimensions {
                                uniform: uniform.to_string(),
                                reason: format!("component '{}' is missing", COMPONENTS[i]),
                            })
                        }
                    }
                }
                components
            }
        };
        out.push(UniformChannels {
            uniform,
            components,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scalar_and_component_names() {
        assert_eq!(
            ChannelName::parse("uOrigin.z").expect("valid"),
            ChannelName {
                uniform: "uOrigin",
                component: Some(2)
            }
        );
        assert_eq!(
            ChannelName::parse("uFovBias").expect("valid").component,
            None
        );
        for bad in ["", ".x", "uOrigin.q", "u.Origin.x", "2fast", "uOrigin."] {
            assert!(ChannelName::parse(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn grouping_checks_dimensions() {
        let c = Curve::new();
        let ok = group_channels([("uA.y", &c), ("uB", &c), ("uA.x", &c)]).expect("valid");
        assert_eq!(ok.len(), 2);
        assert_eq!(ok[0].uniform, "uA");
        assert_eq!(ok[0].element_count(), 2);
        assert_eq!(ok[1].element_count(), 1);

        let gap = group_channels([("uA.x", &c), ("uA.z", &c)]);
        assert!(matches!(gap, Err(CurveError::InconsistentDimensions { .. })));
        let mixed = group_channels([("uA", &c), ("uA.x", &c)]);
        assert!(matches!(mixed, Err(CurveError::InconsistentDimensions { .. })));
    }
}
