use once_cell::sync::Lazy;
use serde::Deserialize;
use tracing::{debug, info};
use v8::{Context, ContextScope, HandleScope, Script};

use super::{Console, EvalMode, ScriptEngine, ScriptError};
use crate::core::ConsoleLine;

static V8_PLATFORM: Lazy<()> = Lazy::new(|| {
    let platform = v8::new_default_platform(0, false).make_shared();
    v8::V8::initialize_platform(platform);
    v8::V8::initialize();
    info!("V8 platform initialized ({})", v8::V8::get_version());
});

/// Global installed by the prelude; returns the run report as JSON
const REPORT_FN: &str = "__playgroundReport";

/// What the prelude collected during one evaluation
#[derive(Debug, Deserialize)]
struct Report {
    #[serde(default)]
    logs: Vec<ConsoleLine>,
    value: Option<String>,
    error: Option<String>,
}

/// Evaluates JavaScript in a fresh V8 isolate per call
#[derive(Debug, Clone, Copy)]
pub struct V8Engine;

impl V8Engine {
    pub fn new() -> Self {
        Lazy::force(&V8_PLATFORM);
        Self
    }

    pub fn version() -> &'static str {
        Lazy::force(&V8_PLATFORM);
        v8::V8::get_version()
    }

    fn run_isolated(source: &str, mode: EvalMode) -> Result<Report, ScriptError> {
        Lazy::force(&V8_PLATFORM);
        let prelude = Self::generate_prelude(source, mode)?;

        let isolate = &mut v8::Isolate::new(v8::CreateParams::default());
        let scope = std::pin::pin!(HandleScope::new(isolate));
        let scope = &mut scope.init();
        let v8_context = Context::new(scope, Default::default());
        let scope = &mut ContextScope::new(scope, v8_context);

        let code = v8::String::new(scope, &prelude)
            .ok_or_else(|| ScriptError::Engine("Failed to create V8 string".into()))?;
        let script = Script::compile(scope, code, None)
            .ok_or_else(|| ScriptError::Engine("Failed to compile prelude".into()))?;
        script
            .run(scope)
            .ok_or_else(|| ScriptError::Engine("Prelude execution failed".into()))?;

        // Let resolved promises flush their console output before reporting
        scope.perform_microtask_checkpoint();

        let report_call = v8::String::new(scope, &format!("{}()", REPORT_FN))
            .ok_or_else(|| ScriptError::Engine("Failed to create V8 string".into()))?;
        let report_script = Script::compile(scope, report_call, None)
            .ok_or_else(|| ScriptError::Engine("Failed to compile report call".into()))?;
        let report = report_script
            .run(scope)
            .ok_or_else(|| ScriptError::Engine("Report call failed".into()))?;
        let report = report
            .to_string(scope)
            .ok_or_else(|| ScriptError::Engine("Report is not a string".into()))?
            .to_rust_string_lossy(scope);

        serde_json::from_str(&report)
            .map_err(|e| ScriptError::Engine(format!("Malformed report: {}", e)))
    }

    /// Build the prelude that installs a capturing `console`, evaluates the
    /// user source and records the completion value or thrown message.
    ///
    /// The source travels as a JSON string literal, so it is never spliced
    /// into the prelude as code. Every builtin the prelude needs after the
    /// user source has run is bound up front, and the report is assembled
    /// from string primitives only, so user code cannot corrupt lines that
    /// were already captured.
    fn generate_prelude(source: &str, mode: EvalMode) -> Result<String, ScriptError> {
        let source_literal = serde_json::to_string(source)
            .map_err(|e| ScriptError::Engine(format!("Failed to encode source: {}", e)))?;

        Ok(format!(
            r#"
(function (source, mode) {{
    const stringify = JSON.stringify;
    const toStr = String;
    const objectToString = Object.prototype.toString;
    const defineProperty = Object.defineProperty;
    const indirectEval = eval;
    const makeFunction = Function;

    const levels = [];
    const messages = [];
    let count = 0;
    let value = null;
    let error = null;

    const asText = function (arg) {{
        try {{
            const text = toStr(arg);
            if (typeof text === 'string') {{
                return text;
            }}
        }} catch (_) {{
            // fall through
        }}
        try {{
            return objectToString.call(arg);
        }} catch (_) {{
            return '[object]';
        }}
    }};

    const format = function (arg) {{
        if (typeof arg === 'object' && arg !== null) {{
            try {{
                const json = stringify(arg, null, 2);
                if (typeof json === 'string') {{
                    return json;
                }}
            }} catch (_) {{
                // cyclic or otherwise unserializable
            }}
        }}
        return asText(arg);
    }};

    const writer = function (level) {{
        return function (...args) {{
            let message = '';
            for (let i = 0; i < args.length; i++) {{
                message = i === 0 ? format(args[i]) : message + ' ' + format(args[i]);
            }}
            levels[count] = level;
            messages[count] = message;
            count++;
        }};
    }};
    const writeError = writer('error');

    const quote = function (text) {{
        return text === null ? 'null' : stringify(text);
    }};

    globalThis.console = {{ log: writer('log'), error: writeError, warn: writer('warn') }};
    defineProperty(globalThis, '{report_fn}', {{
        value: function () {{
            let logs = '';
            for (let i = 0; i < count; i++) {{
                logs += (i === 0 ? '' : ',')
                    + '{{"level":' + quote(levels[i]) + ',"message":' + quote(messages[i]) + '}}';
            }}
            return '{{"logs":[' + logs + '],"value":' + quote(value) + ',"error":' + quote(error) + '}}';
        }},
    }});

    try {{
        if (mode === 'expression') {{
            const completion = indirectEval(source);
            if (completion !== undefined) {{
                value = asText(completion);
            }}
        }} else {{
            const completion = makeFunction(source)();
            if (completion !== undefined) {{
                value = format(completion);
            }}
        }}
    }} catch (e) {{
        let message;
        try {{
            message = (e !== null && typeof e === 'object' && 'message' in e)
                ? format(e.message)
                : format(e);
        }} catch (_) {{
            message = asText(e);
        }}
        if (mode !== 'expression') {{
            writeError('Runtime Error:', message);
        }}
        error = message;
    }}
}})({source}, '{mode}');
"#,
            report_fn = REPORT_FN,
            source = source_literal,
            mode = mode.as_str(),
        ))
    }
}

impl ScriptEngine for V8Engine {
    fn evaluate(
        &self,
        source: &str,
        mode: EvalMode,
        console: &Console,
    ) -> Result<Option<String>, ScriptError> {
        debug!("Evaluating {} bytes of JavaScript ({})", source.len(), mode.as_str());

        let report = Self::run_isolated(source, mode)?;

        for line in &report.logs {
            console.write(line.level, &line.message);
        }

        match report.error {
            Some(message) => Err(ScriptError::Thrown(message)),
            None => Ok(report.value),
        }
    }
}
