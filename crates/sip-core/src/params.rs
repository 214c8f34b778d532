use std::collections::BTreeMap;
use std::fmt;

use smol_str::SmolStr;

/// Generic `;name[=value]` parameter list shared by URIs, name-addrs and Via.
pub type Params = BTreeMap<SmolStr, Option<SmolStr>>;

/// Parses the text following the first `;` of a parameter list.
pub(crate) fn parse_params<'a>(parts: impl Iterator<Item = &'a str>) -> Params {
    let mut params = Params::new();
    for param in parts {
        let param = param.trim();
        if param.is_empty() {
            continue;
        }
        match param.split_once('=') {
            Some((k, v)) => {
                params.insert(SmolStr::new(k.trim()), Some(SmolStr::new(v.trim())));
            }
            None => {
                params.insert(SmolStr::new(param), None);
            }
        }
    }
    params
}

pub(crate) fn write_params(f: &mut fmt::Formatter<'_>, params: &Params) -> fmt::Result {
    for (name, value) in params {
        match value {
            Some(value) => write!(f, ";{}={}", name, value)?,
            None => write!(f, ";{}", name)?,
        }
    }
    Ok(())
}
