use crate::infrastructure::tools::policy::CommandPolicy;
use crate::infrastructure::tools::schema::TOOL_NAME;
use crate::strings::templates;

pub const TOOL_DESCRIPTION: &str = "Execute kubectl commands against the Kubernetes cluster. \
Use this tool for ALL cluster queries: getting resources, checking logs, describing objects, \
viewing metrics, scaling, etc. \
Examples: ['get', 'pods', '-n', 'default'], ['logs', 'pod-name', '--tail=50'], \
['describe', 'deployment', 'my-app']";

pub const COMMAND_PARTS_DESCRIPTION: &str = "kubectl command as array of arguments. \
Do NOT include 'kubectl' itself. \
Examples: ['get', 'pods', '-n', 'kube-system'], ['logs', 'nginx-pod', '--tail=100'], \
['describe', 'node', 'worker-1']";

/// A builder for rendering prompts with context.
pub struct PromptRenderer<'a> {
    template: &'a str,
    replacements: Vec<(&'a str, String)>,
}

impl<'a> PromptRenderer<'a> {
    pub fn new(template: &'a str) -> Self {
        Self {
            template,
            replacements: Vec::new(),
        }
    }

    pub fn set(mut self, key: &'a str, value: impl Into<String>) -> Self {
        self.replacements.push((key, value.into()));
        self
    }

    pub fn render(self) -> String {
        let mut result = self.template.to_string();
        for (key, value) in self.replacements {
            result = result.replace(key, &value);
        }

        if let Some(start) = result.find("{{")
            && let Some(end) = result[start..].find("}}")
        {
            let placeholder = &result[start..start + end + 2];
            tracing::error!("Unreplaced placeholder in rendered prompt: {}", placeholder);
        }

        result
    }
}

/// Operating instructions that open every session.
pub fn system_prompt(policy: &CommandPolicy) -> String {
    let verbs = policy.verbs().collect::<Vec<_>>().join(", ");

    PromptRenderer::new(templates::SYSTEM_PROMPT_TEMPLATE)
        .set("{{TOOL_NAME}}", TOOL_NAME)
        .set("{{TOOL}}", policy.tool())
        .set("{{VERBS}}", verbs)
        .render()
}
