/// Fenced-code language tag for a file path, derived from its extension or well-known name.
pub fn from_path(path: &str) -> Option<&'static str> {
	let name = path.rsplit('/').next().unwrap_or(path);

	match name {
		"Dockerfile" => return Some("dockerfile"),
		"Makefile" => return Some("makefile"),
		_ => {},
	}

	let (_, extension) = name.rsplit_once('.')?;
	let language = match extension.to_ascii_lowercase().as_str() {
		"rs" => "rust",
		"py" | "pyi" => "python",
		"go" => "go",
		"java" => "java",
		"kt" | "kts" => "kotlin",
		"scala" => "scala",
		"js" | "mjs" | "cjs" => "javascript",
		"jsx" => "jsx",
		"ts" | "mts" => "typescript",
		"tsx" => "tsx",
		"c" | "h" => "c",
		"cc" | "cpp" | "cxx" | "hpp" | "hh" => "cpp",
		"cs" => "csharp",
		"rb" => "ruby",
		"php" => "php",
		"swift" => "swift",
		"ex" | "exs" => "elixir",
		"erl" => "erlang",
		"hs" => "haskell",
		"lua" => "lua",
		"sh" | "bash" => "bash",
		"sql" => "sql",
		"proto" => "protobuf",
		"md" => "markdown",
		"json" => "json",
		"yaml" | "yml" => "yaml",
		"toml" => "toml",
		"gd" => "gdscript",
		_ => return None,
	};

	Some(language)
}
