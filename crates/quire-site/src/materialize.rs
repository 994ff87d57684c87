//! Output unit materialization.
//!
//! Rendering leaves identifiers in the markup; this pass binds them. The
//! script block lists, in order: component imports, dependency imports,
//! awaited values (resolved one at a time in registration order) and
//! hoisted expressions. The markup follows in the template block.

use std::fmt::Write;

use quire_renderer::{Await, AwaitError, Dependency, Expression};

/// Error materializing an output unit.
#[derive(Debug, thiserror::Error)]
pub enum MaterializeError {
    #[error("failed to resolve {id}: {source}")]
    Await {
        id: String,
        #[source]
        source: AwaitError,
    },
}

/// Everything one output unit is assembled from.
#[derive(Debug, Clone, Copy)]
pub struct Unit<'a> {
    /// Component import statements, newline terminated.
    pub components: &'a str,
    pub dependencies: &'a [Dependency],
    pub awaits: &'a [Await],
    pub expressions: &'a [Expression],
    /// Markup with stats slots already injected.
    pub html: &'a str,
}

/// Resolve every await and assemble the unit text.
///
/// # Errors
///
/// Returns [`MaterializeError::Await`] for the first await that fails; later
/// awaits are not started.
pub async fn materialize(unit: Unit<'_>) -> Result<String, MaterializeError> {
    let mut out = String::from("<script setup lang=\"tsx\">\n");
    out.push_str(unit.components);

    for dep in unit.dependencies {
        writeln!(out, r#"import {} from "{}";"#, dep.id, dep.src).unwrap();
    }

    for slot in unit.awaits {
        let value = (slot.target)()
            .await
            .map_err(|source| MaterializeError::Await {
                id: slot.id.clone(),
                source,
            })?;
        writeln!(out, "const {} = {value};", slot.id).unwrap();
    }

    for expr in unit.expressions {
        writeln!(out, "const {} = {};", expr.id, expr.content).unwrap();
    }

    out.push_str("</script>\n\n<template>\n");
    out.push_str(unit.html);
    out.push_str("</template>\n");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use pretty_assertions::assert_eq;
    use quire_renderer::{AwaitFuture, AwaitTarget};

    use super::*;

    fn target(value: &'static str) -> AwaitTarget {
        Arc::new(move || -> AwaitFuture { Box::pin(async move { Ok(value.to_owned()) }) })
    }

    #[tokio::test]
    async fn test_unit_layout() {
        let deps = [Dependency {
            id: "temp_0".to_owned(),
            src: "@cache/temp/a.0.1234abcd.svg".to_owned(),
        }];
        let awaits = [Await {
            id: "await_0".to_owned(),
            target: target(r#"{"width":1,"height":2}"#),
        }];
        let exprs = [Expression {
            id: "expr_0".to_owned(),
            content: r#""x""#.to_owned(),
        }];

        let text = materialize(Unit {
            components: "import Note from \"@/components/md/Note.vue\";\n",
            dependencies: &deps,
            awaits: &awaits,
            expressions: &exprs,
            html: "<p>{{expr_0}}</p>\n",
        })
        .await
        .unwrap();

        assert_eq!(
            text,
            "<script setup lang=\"tsx\">\n\
             import Note from \"@/components/md/Note.vue\";\n\
             import temp_0 from \"@cache/temp/a.0.1234abcd.svg\";\n\
             const await_0 = {\"width\":1,\"height\":2};\n\
             const expr_0 = \"x\";\n\
             </script>\n\n<template>\n<p>{{expr_0}}</p>\n</template>\n"
        );
    }

    #[tokio::test]
    async fn test_awaits_run_in_order() {
        let counter = Arc::new(AtomicUsize::new(0));
        let make = |counter: Arc<AtomicUsize>| -> AwaitTarget {
            Arc::new(move || -> AwaitFuture {
                let counter = Arc::clone(&counter);
                Box::pin(async move {
                    tokio::task::yield_now().await;
                    Ok(counter.fetch_add(1, Ordering::SeqCst).to_string())
                })
            })
        };
        let awaits: Vec<_> = (0..3)
            .map(|i| Await {
                id: format!("await_{i}"),
                target: make(Arc::clone(&counter)),
            })
            .collect();

        let text = materialize(Unit {
            components: "",
            dependencies: &[],
            awaits: &awaits,
            expressions: &[],
            html: "",
        })
        .await
        .unwrap();

        assert!(text.contains("const await_0 = 0;\nconst await_1 = 1;\nconst await_2 = 2;\n"));
    }

    #[tokio::test]
    async fn test_failed_await_names_slot() {
        let failing: AwaitTarget =
            Arc::new(|| -> AwaitFuture { Box::pin(async { Err("host unreachable".into()) }) });
        let awaits = [
            Await {
                id: "await_0".to_owned(),
                target: target("null"),
            },
            Await {
                id: "await_1".to_owned(),
                target: failing,
            },
        ];

        let err = materialize(Unit {
            components: "",
            dependencies: &[],
            awaits: &awaits,
            expressions: &[],
            html: "",
        })
        .await
        .unwrap_err();

        assert_eq!(err.to_string(), "failed to resolve await_1: host unreachable");
    }
}
