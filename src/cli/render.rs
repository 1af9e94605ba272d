//! Directory hierarchy rendering via termtree

use generational_arena::Index;
use termtree::Tree;

use crate::cli::output;
use crate::domain::{CoverageTree, DirectoryArena};

pub trait ToTermTree {
    fn to_term_tree(&self, with_packages: bool) -> Tree<String>;
}

impl ToTermTree for CoverageTree {
    fn to_term_tree(&self, with_packages: bool) -> Tree<String> {
        let dirs = self.directories();
        build(self, dirs, dirs.root(), with_packages)
    }
}

fn build(tree: &CoverageTree, dirs: &DirectoryArena, idx: Index, with_packages: bool) -> Tree<String> {
    let Some(node) = dirs.get_node(idx) else {
        return Tree::new(String::new());
    };
    let dir = &node.data;
    let label = format!(
        "{} {} ({}/{})",
        dir,
        output::rate(dir.coverage_rate()),
        dir.covered_lines,
        dir.total_lines
    );

    let mut leaves: Vec<Tree<String>> = node
        .children
        .values()
        .map(|&child| build(tree, dirs, child, with_packages))
        .collect();

    if with_packages {
        leaves.extend(dir.packages.iter().filter_map(|path| {
            tree.get_package(path).map(|p| {
                Tree::new(format!(
                    "[{}] {} ({}/{})",
                    p.name,
                    output::rate(p.coverage_rate),
                    p.covered_lines,
                    p.total_lines
                ))
            })
        }));
    }

    Tree::new(label).with_leaves(leaves)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DecodedFunction, DecodedPackage, DecodedUnit};

    fn package(import_path: &str, covered: bool) -> DecodedPackage {
        DecodedPackage {
            import_path: import_path.into(),
            module_path: "example.com/m".into(),
            name: String::new(),
            metadata: Default::default(),
            functions: vec![DecodedFunction {
                name: "f".into(),
                file: "f.go".into(),
                is_literal: false,
                units: vec![DecodedUnit {
                    start_line: 1,
                    start_col: 1,
                    end_line: 4,
                    end_col: 2,
                    count: u64::from(covered),
                }],
            }],
        }
    }

    #[test]
    fn given_nested_packages_when_rendering_then_directories_nest() {
        colored::control::set_override(false);
        let mut tree = CoverageTree::new();
        tree.add_record(package("a/b/c", true)).unwrap();
        tree.add_record(package("a/d", false)).unwrap();
        tree.recalculate();

        let rendered = tree.to_term_tree(true).to_string();

        let lines: Vec<&str> = rendered.lines().collect();
        assert!(lines[0].starts_with("/ "), "root first: {rendered}");
        assert!(rendered.contains("a  50.0% (4/8)"), "{rendered}");
        assert!(rendered.contains("b 100.0% (4/4)"), "{rendered}");
        assert!(rendered.contains("[c] 100.0% (4/4)"), "{rendered}");
        assert!(rendered.contains("[d]   0.0% (0/4)"), "{rendered}");
    }
}
