// Message roles
pub const ROLE_USER: &str = "user";
pub const ROLE_ASSISTANT: &str = "assistant";
pub const ROLE_TOOL: &str = "tool";

// LLM stop reasons
pub const STOP_END_TURN: &str = "end_turn";
pub const STOP_STOP: &str = "stop";
pub const STOP_TOOL_USE: &str = "tool_use";

// Provider names
pub const PROVIDER_GROQ: &str = "groq";
pub const PROVIDER_ANTHROPIC: &str = "anthropic";

// Tool names (employee database)
pub const TOOL_GET_EMPLOYEE: &str = "get_employee";
pub const TOOL_SEARCH_EMPLOYEES: &str = "search_employees";
pub const TOOL_GET_EMPLOYEES_BY_DEPARTMENT: &str = "get_employees_by_department";
pub const TOOL_GET_ALL_EMPLOYEES: &str = "get_all_employees";

// Tool names (announcements)
pub const TOOL_LIST_ANNOUNCEMENTS: &str = "list_announcements";
pub const TOOL_READ_ANNOUNCEMENT: &str = "read_announcement";
pub const TOOL_SEARCH_ANNOUNCEMENTS: &str = "search_announcements";

// Tool names (policy documents)
pub const TOOL_SEARCH_POLICIES: &str = "search_policies";
pub const TOOL_LIST_POLICIES: &str = "list_policies";

// Model defaults
pub const DEFAULT_GROQ_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_MAX_TOKENS: i32 = 4096;
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Persona and data domains given to the model on both calls of a turn.
pub const SYSTEM_PROMPT: &str = "You are a helpful and confident HR assistant with direct access to:

1. **Employee Database**: Employee information, departments, contact details
2. **Announcements**: Company announcements, holidays, team events, policy updates
3. **Policy Documents**: HR policies (leave policy, salary policy, etc.)

Your behavior:
- Provide direct, accurate answers using the tools available
- Be concise and professional
- Format lists clearly with line breaks between items for better readability

Be confident and helpful.";
