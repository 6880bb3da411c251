//! Tree rendering for bone hierarchies

use console::Style;
use sxr_anim::{BoneOptions, SkeletonDescription};

/// A node in a rendered tree
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub name: String,
    pub node_type: NodeType,
    pub children: Vec<TreeNode>,
    pub metadata: Vec<(String, String)>,
}

/// Kinds of nodes in a skeleton tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Skeleton,
    Bone,
    Animated,
    Physics,
    Locked,
}

/// Options for tree rendering
#[derive(Debug, Clone)]
pub struct TreeOptions {
    pub max_depth: Option<usize>,
    pub no_color: bool,
    pub show_metadata: bool,
    pub compact: bool,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            max_depth: None,
            no_color: false,
            show_metadata: true,
            compact: false,
        }
    }
}

impl TreeNode {
    pub fn new(name: String, node_type: NodeType) -> Self {
        Self {
            name,
            node_type,
            children: Vec::new(),
            metadata: Vec::new(),
        }
    }

    pub fn add_child(mut self, child: TreeNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.push((key.to_string(), value.to_string()));
        self
    }
}

impl NodeType {
    /// Node type for a bone, locked taking precedence over physics and animation
    pub fn for_bone(options: BoneOptions) -> Self {
        if options.contains(BoneOptions::LOCKED) {
            Self::Locked
        } else if options.contains(BoneOptions::PHYSICS) {
            Self::Physics
        } else if options.contains(BoneOptions::ANIMATED) {
            Self::Animated
        } else {
            Self::Bone
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Self::Skeleton => "🦴",
            Self::Bone => "○",
            Self::Animated => "▶",
            Self::Physics => "◆",
            Self::Locked => "🔒",
        }
    }

    pub fn style(self, no_color: bool) -> Style {
        if no_color {
            Style::new()
        } else {
            match self {
                Self::Skeleton => Style::new().bold().cyan(),
                Self::Bone => Style::new(),
                Self::Animated => Style::new().green(),
                Self::Physics => Style::new().magenta(),
                Self::Locked => Style::new().red(),
            }
        }
    }
}

/// Build a tree from a skeleton description, one root node per skeleton
///
/// Bones are attached under their parent; parents always precede children
/// in a valid description.
pub fn skeleton_tree(title: &str, desc: &SkeletonDescription) -> TreeNode {
    let count = desc.bones.len();
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); count];
    let mut roots = Vec::new();
    for (i, bone) in desc.bones.iter().enumerate() {
        match usize::try_from(bone.parent) {
            Ok(p) if p < i => children[p].push(i),
            _ => roots.push(i),
        }
    }

    fn build(desc: &SkeletonDescription, children: &[Vec<usize>], index: usize) -> TreeNode {
        let bone = &desc.bones[index];
        let mut node = TreeNode::new(bone.name.clone(), NodeType::for_bone(bone.options))
            .with_metadata("index", &index.to_string());
        if !bone.options.is_empty() {
            node = node.with_metadata("options", &format!("{:?}", bone.options));
        }
        // Row-major: translation sits in the last column
        let (x, y, z) = (bone.local[3], bone.local[7], bone.local[11]);
        if x != 0.0 || y != 0.0 || z != 0.0 {
            node = node.with_metadata("offset", &format!("({x:.3}, {y:.3}, {z:.3})"));
        }
        for &child in &children[index] {
            node = node.add_child(build(desc, children, child));
        }
        node
    }

    let mut root =
        TreeNode::new(title.to_string(), NodeType::Skeleton).with_metadata("count", &count.to_string());
    for index in roots {
        root = root.add_child(build(desc, &children, index));
    }
    root
}

/// Render a tree structure to string
pub fn render_tree(root: &TreeNode, options: &TreeOptions) -> String {
    let mut output = String::new();
    render_node(root, &mut output, "", true, 0, options);
    output
}

fn render_node(
    node: &TreeNode,
    output: &mut String,
    prefix: &str,
    is_last: bool,
    depth: usize,
    options: &TreeOptions,
) {
    if let Some(max_depth) = options.max_depth
        && depth > max_depth
    {
        return;
    }

    let icon = node.node_type.icon();
    let style = node.node_type.style(options.no_color);
    let connector = if depth == 0 {
        ""
    } else if is_last {
        "└── "
    } else {
        "├── "
    };

    let mut line = format!("{prefix}{connector}{icon} {}", style.apply_to(&node.name));

    if options.show_metadata && options.compact && !node.metadata.is_empty() {
        let parts: Vec<String> = node
            .metadata
            .iter()
            .map(|(key, value)| format!("{key}:{value}"))
            .collect();
        line.push_str(&format!(" [{}]", parts.join(", ")));
    }

    output.push_str(&line);
    output.push('\n');

    let child_prefix = if depth == 0 {
        String::new()
    } else {
        format!("{prefix}{}", if is_last { "    " } else { "│   " })
    };

    if options.show_metadata && !options.compact {
        let meta_style = Style::new().dim();
        for (key, value) in &node.metadata {
            output.push_str(&format!(
                "{child_prefix}    · {}: {value}\n",
                meta_style.apply_to(key)
            ));
        }
    }

    for (i, child) in node.children.iter().enumerate() {
        let is_last_child = i == node.children.len() - 1;
        render_node(
            child,
            output,
            &child_prefix,
            is_last_child,
            depth + 1,
            options,
        );
    }
}
