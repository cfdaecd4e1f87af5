//! Python harness templates
//!
//! The harness is appended after the candidate source. Every value it needs
//! is embedded as a JSON string literal, which is also a valid Python string
//! literal, and decoded with `json.loads` at runtime.

/// Helpers shared by the test harness and the oracle recorder
const PRELUDE: &str = r#"

import copy as _pe_copy
import io as _pe_io
import json as _pe_json
import math as _pe_math
import os as _pe_os
import sys as _pe_sys
import time as _pe_time

_PE_TAG = __PE_TAG__
_pe_out = _pe_os.fdopen(_pe_os.dup(1), "w")


def _pe_emit(line):
    _pe_out.write(_PE_TAG + " " + line + "\n")
    _pe_out.flush()


class _PeSink(_pe_io.TextIOBase):
    def write(self, s):
        return len(s)


def _pe_default(value):
    if isinstance(value, (set, frozenset)):
        try:
            return {"__set__": sorted(value)}
        except TypeError:
            pass
    return repr(value)


def _pe_norm(value):
    try:
        return _pe_json.loads(_pe_json.dumps(value, default=_pe_default))
    except (TypeError, ValueError):
        return repr(value)


def _pe_entry(name):
    fn = globals().get(name)
    if fn is None:
        _pe_emit("error " + _pe_json.dumps({"test": "setup", "type": "NameError", "message": "entry point %r is not defined" % name}))
        raise NameError(name)
    return fn
"#;

/// Runs every test against the candidate and reports through markers
const TEST_BODY: &str = r#"

class _PeMismatch(AssertionError):
    pass


def _pe_has_float(value):
    if isinstance(value, float):
        return True
    if isinstance(value, list):
        return any(_pe_has_float(v) for v in value)
    if isinstance(value, dict):
        return any(_pe_has_float(v) for v in value.values())
    return False


def _pe_close(got, expected, atol):
    if isinstance(got, bool) or isinstance(expected, bool):
        return got == expected
    if isinstance(got, (int, float)) and isinstance(expected, (int, float)):
        if isinstance(got, float) or isinstance(expected, float):
            if _pe_math.isnan(got) or _pe_math.isnan(expected):
                return _pe_math.isnan(got) and _pe_math.isnan(expected)
            return _pe_math.isclose(got, expected, rel_tol=1e-07, abs_tol=atol)
        return got == expected
    if isinstance(got, list) and isinstance(expected, list):
        return len(got) == len(expected) and all(_pe_close(g, e, atol) for g, e in zip(got, expected))
    if isinstance(got, dict) and isinstance(expected, dict):
        return got.keys() == expected.keys() and all(_pe_close(got[k], expected[k], atol) for k in got)
    return got == expected


def _pe_run_tests():
    ids = _pe_json.loads(__PE_IDS__)
    inputs = _pe_json.loads(__PE_INPUTS__)
    expected = [_pe_json.loads(e) for e in _pe_json.loads(__PE_EXPECTED__)]
    atol = __PE_ATOL__
    exhaustive = __PE_EXHAUSTIVE__
    fn = _pe_entry(__PE_ENTRY__)

    _pe_sys.stdout = _PeSink()
    results = []
    for i, args in enumerate(inputs):
        try:
            got = _pe_norm(fn(*_pe_copy.deepcopy(args)))
            tol = atol if atol > 0 or not _pe_has_float(expected[i]) else 1e-06
            ok = _pe_close(got, expected[i], tol)
        except BaseException as exc:
            _pe_emit("error " + _pe_json.dumps({"test": ids[i], "type": type(exc).__name__, "message": str(exc)[:500]}))
            raise
        if not ok and not exhaustive:
            _pe_emit("fail %d" % i)
            raise _PeMismatch(ids[i])
        results.append(ok)

    if exhaustive:
        _pe_emit("results " + _pe_json.dumps(results))
    _pe_emit("done")
    _pe_out.close()
    _pe_os._exit(0)


_pe_run_tests()
"#;

/// Calls the canonical solution on every input and records output and time
const RECORD_BODY: &str = r#"

def _pe_record():
    inputs = _pe_json.loads(__PE_INPUTS__)
    fn = _pe_entry(__PE_ENTRY__)

    _pe_sys.stdout = _PeSink()
    for i, args in enumerate(inputs):
        start = _pe_time.perf_counter()
        got = fn(*_pe_copy.deepcopy(args))
        elapsed = _pe_time.perf_counter() - start
        _pe_emit("output " + _pe_json.dumps({"index": i, "value": _pe_json.dumps(_pe_norm(got)), "time": elapsed}))

    _pe_emit("done")
    _pe_out.close()
    _pe_os._exit(0)


_pe_record()
"#;

/// Values substituted into the harness templates
pub(crate) struct HarnessParams<'a> {
    pub tag: &'a str,
    pub entry_point: &'a str,
    pub ids_json: String,
    pub inputs_json: String,
    pub expected_json: String,
    pub atol: f64,
    pub exhaustive: bool,
}

/// Python literal for an arbitrary string
fn py_str(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

/// Python literal for a float, always with a decimal point or exponent
fn py_float(value: f64) -> String {
    if value.is_finite() && value > 0.0 {
        format!("{:?}", value)
    } else {
        "0.0".to_string()
    }
}

fn prelude(tag: &str) -> String {
    PRELUDE.replace("__PE_TAG__", &py_str(tag))
}

/// Harness block for a test program
pub(crate) fn render_tests(params: &HarnessParams<'_>) -> String {
    let body = TEST_BODY
        .replace("__PE_IDS__", &py_str(&params.ids_json))
        .replace("__PE_INPUTS__", &py_str(&params.inputs_json))
        .replace("__PE_EXPECTED__", &py_str(&params.expected_json))
        .replace("__PE_ATOL__", &py_float(params.atol))
        .replace(
            "__PE_EXHAUSTIVE__",
            if params.exhaustive { "True" } else { "False" },
        )
        .replace("__PE_ENTRY__", &py_str(params.entry_point));
    format!("{}{}", prelude(params.tag), body)
}

/// Harness block for an oracle recorder
pub(crate) fn render_recorder(tag: &str, entry_point: &str, inputs_json: &str) -> String {
    let body = RECORD_BODY
        .replace("__PE_INPUTS__", &py_str(inputs_json))
        .replace("__PE_ENTRY__", &py_str(entry_point));
    format!("{}{}", prelude(tag), body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_py_str_escapes_quotes_and_newlines() {
        assert_eq!(py_str("a\"b\nc"), r#""a\"b\nc""#);
    }

    #[test]
    fn test_py_float() {
        assert_eq!(py_float(1e-6).parse::<f64>().unwrap(), 1e-6);
        assert_eq!(py_float(0.5), "0.5");
        assert_eq!(py_float(2.0), "2.0");
        assert_eq!(py_float(0.0), "0.0");
        assert_eq!(py_float(f64::NAN), "0.0");
    }

    #[test]
    fn test_render_substitutes_every_placeholder() {
        let params = HarnessParams {
            tag: "@@pluseval-000000000000",
            entry_point: "add",
            ids_json: "[]".into(),
            inputs_json: "[]".into(),
            expected_json: "[]".into(),
            atol: 0.0,
            exhaustive: true,
        };
        let block = render_tests(&params);
        assert!(!block.contains("__PE_"));
        assert!(block.contains("exhaustive = True"));

        let recorder = render_recorder("@@pluseval-000000000000", "add", "[[1, 2]]");
        assert!(!recorder.contains("__PE_"));
    }
}
