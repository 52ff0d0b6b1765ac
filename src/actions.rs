// src/actions.rs
// Rewrites rule actions so every pseudo-variable becomes a concrete slot:
// `$$` the pending result, `$N` the frame `window - N` below the top.
use crate::{
    error::GenError,
    grammar::{Grammar, PseudoVar, Rule},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// Verbatim user source.
    Text(String),
    /// Field of the pending reduction's payload.
    Result { field: String },
    /// Field of the frame `depth` slots below the top of the stack.
    Stack { depth: usize, field: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionBody {
    Code(Vec<Fragment>),
    /// Implicit `$$ = $1` for a typed rule without an action.
    CopyThrough {
        field: String,
        depth: usize,
        from: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StitchedAction {
    pub rule: usize,
    pub body: ActionBody,
}

/// Stitches every rule that needs a reduction body, in rule order. Rules with
/// neither an action nor a declared type are no-op reductions and are skipped.
pub fn stitch_actions(g: &Grammar) -> Result<Vec<StitchedAction>, GenError> {
    let mut out = Vec::new();
    for rule in &g.rules {
        if let Some(body) = stitch_rule(g, rule)? {
            out.push(StitchedAction {
                rule: rule.index,
                body,
            });
        }
    }
    Ok(out)
}

fn stitch_rule(g: &Grammar, rule: &Rule) -> Result<Option<ActionBody>, GenError> {
    let result = g.symbol(rule.sym);
    let typ = result.ty.as_str();
    let (components, window) = match rule.parent {
        Some(p) => (&g.rules[p].components, rule.max_parent_dlr),
        None => (&rule.components, rule.components.len()),
    };

    if rule.action.is_empty() {
        if typ.is_empty() || rule.parent.is_some() {
            return Ok(None);
        }
        let Some(&first) = components.first() else {
            log::warn!("rule {}: `{}` is typed but has no components", rule.index, result.name);
            return Ok(None);
        };
        let from = g.symbol(first);
        if from.ty != typ {
            log::warn!(
                "rule {}: no default action, `{}` is <{}> but `{}` is <{}>",
                rule.index,
                result.name,
                typ,
                from.name,
                from.ty
            );
            return Ok(None);
        }
        return Ok(Some(ActionBody::CopyThrough {
            field: typ.to_string(),
            depth: window - 1,
            from: from.ty.clone(),
        }));
    }

    let positional = |num: usize| -> Result<usize, GenError> {
        if num == 0 || num > window || num > components.len() {
            return Err(GenError::PositionalOutOfRange {
                rule: rule.index,
                num,
                max: window.min(components.len()),
            });
        }
        Ok(window - num)
    };

    let mut body = Vec::with_capacity(rule.action.len() * 2);
    for part in &rule.action {
        if !part.src.is_empty() {
            body.push(Fragment::Text(part.src.clone()));
        }
        let Some(var) = &part.var else { continue };
        body.push(match var {
            PseudoVar::Result => {
                if typ.is_empty() {
                    return Err(GenError::UntypedResult {
                        rule: rule.index,
                        name: result.name.clone(),
                    });
                }
                Fragment::Result {
                    field: typ.to_string(),
                }
            }
            PseudoVar::Positional(num) => {
                let depth = positional(*num)?;
                let sym = g.symbol(components[num - 1]);
                if sym.ty.is_empty() {
                    return Err(GenError::UntypedComponent {
                        rule: rule.index,
                        num: *num,
                        name: sym.name.clone(),
                    });
                }
                Fragment::Stack {
                    depth,
                    field: sym.ty.clone(),
                }
            }
            PseudoVar::TaggedResult(tag) => Fragment::Result { field: tag.clone() },
            PseudoVar::TaggedPositional { num, tag } => Fragment::Stack {
                depth: positional(*num)?,
                field: tag.clone(),
            },
        });
    }
    Ok(Some(ActionBody::Code(body)))
}
