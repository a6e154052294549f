//! Shared vocabularies for rule-based summarization and query parsing.

/// Technical skills recognised in resumes and queries: (lowercase pattern, display name).
pub const SKILLS: &[(&str, &str)] = &[
    // Languages
    ("python", "Python"),
    ("java", "Java"),
    ("javascript", "JavaScript"),
    ("typescript", "TypeScript"),
    ("c++", "C++"),
    ("c#", "C#"),
    ("go", "Go"),
    ("golang", "Go"),
    ("rust", "Rust"),
    ("php", "PHP"),
    ("ruby", "Ruby"),
    ("swift", "Swift"),
    ("kotlin", "Kotlin"),
    ("scala", "Scala"),
    ("matlab", "MATLAB"),
    ("sql", "SQL"),
    // Web frameworks
    ("react", "React"),
    ("angular", "Angular"),
    ("vue", "Vue"),
    ("django", "Django"),
    ("flask", "Flask"),
    ("fastapi", "FastAPI"),
    ("spring", "Spring"),
    ("express", "Express"),
    ("nodejs", "Node.js"),
    ("node.js", "Node.js"),
    ("laravel", "Laravel"),
    ("rails", "Rails"),
    ("next.js", "Next.js"),
    ("nuxt", "Nuxt"),
    // Databases
    ("postgresql", "PostgreSQL"),
    ("mysql", "MySQL"),
    ("mongodb", "MongoDB"),
    ("redis", "Redis"),
    ("elasticsearch", "Elasticsearch"),
    ("sqlite", "SQLite"),
    ("oracle", "Oracle"),
    ("sql server", "SQL Server"),
    ("cassandra", "Cassandra"),
    ("dynamodb", "DynamoDB"),
    // DevOps and cloud
    ("docker", "Docker"),
    ("kubernetes", "Kubernetes"),
    ("aws", "AWS"),
    ("azure", "Azure"),
    ("gcp", "GCP"),
    ("terraform", "Terraform"),
    ("jenkins", "Jenkins"),
    ("gitlab ci", "GitLab CI"),
    ("github actions", "GitHub Actions"),
    ("ansible", "Ansible"),
    // Other
    ("git", "Git"),
    ("linux", "Linux"),
    ("nginx", "Nginx"),
    ("microservices", "Microservices"),
    ("api rest", "API REST"),
    ("graphql", "GraphQL"),
    ("machine learning", "Machine Learning"),
    ("data science", "Data Science"),
    ("big data", "Big Data"),
    ("pandas", "Pandas"),
    ("numpy", "NumPy"),
    ("tensorflow", "TensorFlow"),
    ("pytorch", "PyTorch"),
];

pub const EDUCATION_KEYWORDS: &[(&str, &str)] = &[
    ("doutorado", "Doutorado"),
    ("phd", "PhD"),
    ("mestrado", "Mestrado"),
    ("bacharelado", "Bacharelado"),
    ("graduação", "Graduação"),
    ("tecnólogo", "Tecnólogo"),
    ("técnico", "Técnico"),
    ("ciência da computação", "Ciência da Computação"),
    ("sistemas de informação", "Sistemas de Informação"),
    ("análise de sistemas", "Análise de Sistemas"),
    ("engenharia", "Engenharia"),
    ("universidade", "Universidade"),
    ("faculdade", "Faculdade"),
];

/// Work areas in priority order with their trigger words.
pub const WORK_AREAS: &[(&str, &[&str])] = &[
    (
        "Desenvolvimento de Software",
        &["desenvolvedor", "programador", "software", "frontend", "backend"],
    ),
    ("Ciência de Dados", &["dados", "data", "analytics", "scientist", "analyst"]),
    (
        "DevOps/Infraestrutura",
        &["devops", "infraestrutura", "cloud", "sysadmin", "sre"],
    ),
    ("Mobile", &["mobile", "android", "ios", "aplicativo"]),
    ("UI/UX", &["designer", "ui", "ux", "interface"]),
];

/// Terms ignored when a query names no known skill and its free words are
/// used as skill terms instead.
pub const QUERY_STOPWORDS: &[&str] = &[
    "com", "para", "que", "uma", "dos", "das", "nos", "nas", "por", "and", "the", "with", "for",
    "anos", "ano", "years", "year", "experiência", "experiencia", "experience", "de", "em",
    "sênior", "senior", "pleno", "júnior", "junior", "desenvolvedor", "desenvolvedora",
    "developer", "engenheiro", "engineer", "vaga", "candidato", "profissional", "nível", "nivel",
    "mais", "mínimo", "minimo", "conhecimento", "conhecimentos", "busco", "procuro",
];

/// True when `term` occurs in `haystack` with no alphanumeric character on
/// either side. Both inputs must already be lowercase. Unlike a regex `\b`,
/// this handles terms ending in symbols such as `c++` or `c#`.
pub fn contains_term(haystack: &str, term: &str) -> bool {
    if term.is_empty() {
        return false;
    }
    haystack.match_indices(term).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + term.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

/// Lowercase comparison key for a skill name. Known aliases collapse to the
/// vocabulary display name, so "Golang" and "Go" share a key.
pub fn canonical_skill(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    SKILLS
        .iter()
        .find(|(pattern, display)| lower == *pattern || lower == display.to_lowercase())
        .map(|(_, display)| display.to_lowercase())
        .unwrap_or(lower)
}

/// Display names of every known skill present in `text`, in vocabulary
/// order, without duplicates.
pub fn detect_skills(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let mut found: Vec<String> = Vec::new();
    for (pattern, display) in SKILLS {
        if contains_term(&lower, pattern) && !found.iter().any(|f| f == display) {
            found.push((*display).to_string());
        }
    }
    found
}
