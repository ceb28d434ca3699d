use cmtscope_core::ItemId;
use smol_str::SmolStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub name: SmolStr,
    /// `None` when the declared type could not be resolved.
    pub ty: Option<ItemId>,
}

/// Lexical variable bindings, one frame per enclosing block.
#[derive(Debug, Default, Clone)]
pub struct Scope {
    frames: Vec<Vec<Binding>>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self) {
        self.frames.push(Vec::new());
    }

    pub fn pop(&mut self) {
        self.frames.pop();
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn bind(&mut self, name: &str, ty: Option<ItemId>) {
        if self.frames.is_empty() {
            self.push();
        }
        if let Some(frame) = self.frames.last_mut() {
            frame.push(Binding {
                name: SmolStr::new(name),
                ty,
            });
        }
    }

    /// Innermost binding of `name`.
    pub fn lookup(&self, name: &str) -> Option<&Binding> {
        self.frames
            .iter()
            .rev()
            .flat_map(|frame| frame.iter().rev())
            .find(|b| b.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmtscope_core::JavaItemIndex;

    #[test]
    fn inner_frames_shadow_outer_ones() {
        let mut index = JavaItemIndex::new();
        let int = index.primitive("int").expect("int");
        let long = index.primitive("long").expect("long");

        let mut scope = Scope::new();
        scope.push();
        scope.bind("x", Some(int));
        scope.push();
        scope.bind("x", Some(long));
        scope.bind("y", None);
        assert_eq!(scope.lookup("x").and_then(|b| b.ty), Some(long));
        assert!(scope.lookup("y").is_some_and(|b| b.ty.is_none()));

        scope.pop();
        assert_eq!(scope.lookup("x").and_then(|b| b.ty), Some(int));
        assert!(scope.lookup("y").is_none());
    }
}
