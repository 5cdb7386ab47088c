use rpl::mach::Runtime;

/// Evaluate a command line and return the rendering of the top of the
/// stack, or the error message prefixed with `?`.
pub fn exec(rt: &mut Runtime, source: &str) -> String {
    if let Err(error) = rt.enter(source) {
        return format!("?{}", error);
    }
    top(rt)
}

pub fn top(rt: &Runtime) -> String {
    match rt.peek(0) {
        Ok(obj) => rt
            .render_obj(obj)
            .unwrap_or_else(|e| format!("?{}", e)),
        Err(_) => String::new(),
    }
}

/// The whole stack rendered bottom to top.
pub fn levels(rt: &Runtime) -> Vec<String> {
    rt.stack_iter()
        .map(|&obj| {
            rt.render_obj(obj)
                .unwrap_or_else(|e| format!("?{}", e))
        })
        .collect()
}
