//! Transform helpers inlined at the head of the script bundle.
//!
//! The transformer emits helper calls as `babelHelpers.<name>(..)`. The
//! bundle is loaded with a plain `<script>` tag, so instead of importing a
//! runtime package the bundle defines the helpers it uses up front.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

static HELPER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bbabelHelpers\.([A-Za-z_$][A-Za-z0-9_$]*)").expect("helper pattern is valid")
});

/// Name, helpers it calls, and the defining function.
struct Helper {
    name: &'static str,
    requires: &'static [&'static str],
    source: &'static str,
}

const HELPERS: &[Helper] = &[
    Helper {
        name: "typeof",
        requires: &[],
        source: r#"function _typeof(o) { return _typeof = "function" == typeof Symbol && "symbol" == typeof Symbol.iterator ? function (o) { return typeof o; } : function (o) { return o && "function" == typeof Symbol && o.constructor === Symbol && o !== Symbol.prototype ? "symbol" : typeof o; }, _typeof(o); }"#,
    },
    Helper {
        name: "toPrimitive",
        requires: &["typeof"],
        source: r#"function _toPrimitive(t, r) { if ("object" != _typeof(t) || !t) return t; var e = t[Symbol.toPrimitive]; if (void 0 !== e) { var i = e.call(t, r || "default"); if ("object" != _typeof(i)) return i; throw new TypeError("@@toPrimitive must return a primitive value."); } return ("string" === r ? String : Number)(t); }"#,
    },
    Helper {
        name: "toPropertyKey",
        requires: &["typeof", "toPrimitive"],
        source: r#"function _toPropertyKey(t) { var i = _toPrimitive(t, "string"); return "symbol" == _typeof(i) ? i : i + ""; }"#,
    },
    Helper {
        name: "defineProperty",
        requires: &["toPropertyKey"],
        source: r#"function _defineProperty(e, r, t) { return (r = _toPropertyKey(r)) in e ? Object.defineProperty(e, r, { value: t, enumerable: !0, configurable: !0, writable: !0 }) : e[r] = t, e; }"#,
    },
    Helper {
        name: "ownKeys",
        requires: &[],
        source: r#"function _ownKeys(e, r) { var t = Object.keys(e); if (Object.getOwnPropertySymbols) { var o = Object.getOwnPropertySymbols(e); r && (o = o.filter(function (r) { return Object.getOwnPropertyDescriptor(e, r).enumerable; })), t.push.apply(t, o); } return t; }"#,
    },
    Helper {
        name: "objectSpread2",
        requires: &["ownKeys", "defineProperty"],
        source: r#"function _objectSpread2(e) { for (var r = 1; r < arguments.length; r++) { var t = null != arguments[r] ? arguments[r] : {}; r % 2 ? _ownKeys(Object(t), !0).forEach(function (r) { _defineProperty(e, r, t[r]); }) : Object.getOwnPropertyDescriptors ? Object.defineProperties(e, Object.getOwnPropertyDescriptors(t)) : _ownKeys(Object(t)).forEach(function (r) { Object.defineProperty(e, r, Object.getOwnPropertyDescriptor(t, r)); }); } return e; }"#,
    },
    Helper {
        name: "objectWithoutPropertiesLoose",
        requires: &[],
        source: r#"function _objectWithoutPropertiesLoose(r, e) { if (null == r) return {}; var t = {}; for (var n in r) if ({}.hasOwnProperty.call(r, n)) { if (-1 !== e.indexOf(n)) continue; t[n] = r[n]; } return t; }"#,
    },
    Helper {
        name: "objectWithoutProperties",
        requires: &["objectWithoutPropertiesLoose"],
        source: r#"function _objectWithoutProperties(e, t) { if (null == e) return {}; var o, r, i = _objectWithoutPropertiesLoose(e, t); if (Object.getOwnPropertySymbols) { var n = Object.getOwnPropertySymbols(e); for (r = 0; r < n.length; r++) o = n[r], -1 === t.indexOf(o) && {}.propertyIsEnumerable.call(e, o) && (i[o] = e[o]); } return i; }"#,
    },
    Helper {
        name: "objectDestructuringEmpty",
        requires: &[],
        source: r#"function _objectDestructuringEmpty(t) { if (null == t) throw new TypeError("Cannot destructure " + t); }"#,
    },
    Helper {
        name: "extends",
        requires: &[],
        source: r#"function _extends() { return _extends = Object.assign ? Object.assign.bind() : function (n) { for (var e = 1; e < arguments.length; e++) { var t = arguments[e]; for (var r in t) ({}).hasOwnProperty.call(t, r) && (n[r] = t[r]); } return n; }, _extends.apply(null, arguments); }"#,
    },
    Helper {
        name: "asyncGeneratorStep",
        requires: &[],
        source: r#"function _asyncGeneratorStep(n, t, e, r, o, a, c) { try { var i = n[a](c), u = i.value; } catch (n) { return void e(n); } i.done ? t(u) : Promise.resolve(u).then(r, o); }"#,
    },
    Helper {
        name: "asyncToGenerator",
        requires: &["asyncGeneratorStep"],
        source: r#"function _asyncToGenerator(n) { return function () { var t = this, e = arguments; return new Promise(function (r, o) { var a = n.apply(t, e); function _next(n) { _asyncGeneratorStep(a, r, o, _next, _throw, "next", n); } function _throw(n) { _asyncGeneratorStep(a, r, o, _next, _throw, "throw", n); } _next(void 0); }); }; }"#,
    },
    Helper {
        name: "checkPrivateRedeclaration",
        requires: &[],
        source: r#"function _checkPrivateRedeclaration(e, t) { if (t.has(e)) throw new TypeError("Cannot initialize the same private elements twice on an object"); }"#,
    },
    Helper {
        name: "classPrivateFieldInitSpec",
        requires: &["checkPrivateRedeclaration"],
        source: r#"function _classPrivateFieldInitSpec(e, t, a) { _checkPrivateRedeclaration(e, t), t.set(e, a); }"#,
    },
    Helper {
        name: "classPrivateMethodInitSpec",
        requires: &["checkPrivateRedeclaration"],
        source: r#"function _classPrivateMethodInitSpec(e, a) { _checkPrivateRedeclaration(e, a), a.add(e); }"#,
    },
    Helper {
        name: "assertClassBrand",
        requires: &[],
        source: r#"function _assertClassBrand(e, t, n) { if ("function" == typeof e ? e === t : e.has(t)) return arguments.length < 3 ? t : n; throw new TypeError("Private element is not present on this object"); }"#,
    },
    Helper {
        name: "classPrivateFieldGet2",
        requires: &["assertClassBrand"],
        source: r#"function _classPrivateFieldGet2(s, a) { return s.get(_assertClassBrand(s, a)); }"#,
    },
    Helper {
        name: "classPrivateFieldSet2",
        requires: &["assertClassBrand"],
        source: r#"function _classPrivateFieldSet2(s, a, r) { return s.set(_assertClassBrand(s, a), r), r; }"#,
    },
];

fn lookup(name: &str) -> Option<&'static Helper> {
    HELPERS.iter().find(|h| h.name == name)
}

/// Helper names referenced by transpiled code.
pub fn used_helpers<'a>(scripts: impl IntoIterator<Item = &'a str>) -> BTreeSet<String> {
    scripts
        .into_iter()
        .flat_map(|code| HELPER_RE.captures_iter(code))
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Build the `babelHelpers` definition for the given scripts.
///
/// Returns an empty string when no helper is referenced, and an error naming
/// the helper when one is referenced that cannot be inlined.
pub fn prelude<'a>(scripts: impl IntoIterator<Item = &'a str>) -> Result<String, String> {
    let used = used_helpers(scripts);
    if used.is_empty() {
        return Ok(String::new());
    }

    let mut needed = BTreeSet::new();
    let mut pending: Vec<&str> = used.iter().map(String::as_str).collect();
    while let Some(name) = pending.pop() {
        let helper = lookup(name).ok_or_else(|| {
            format!(
                "transform helper '{}' cannot be inlined; raise the script target",
                name
            )
        })?;
        if needed.insert(helper.name) {
            pending.extend(helper.requires.iter().copied());
        }
    }

    let mut out = String::from("var babelHelpers = (function () {\n");
    for helper in HELPERS.iter().filter(|h| needed.contains(h.name)) {
        out.push_str("  ");
        out.push_str(helper.source);
        out.push('\n');
    }

    let exports: Vec<String> = HELPERS
        .iter()
        .filter(|h| used.contains(h.name))
        .map(|h| format!("\"{}\": _{}", h.name, h.name))
        .collect();
    out.push_str(&format!("  return {{ {} }};\n}})();\n", exports.join(", ")));

    Ok(out)
}
