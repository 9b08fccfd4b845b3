use anyhow::Result;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::io::{self, BufRead, BufReader, Write};
use std::sync::Arc;
use tracing::{info, warn};

use crate::use_cases::{MessagingUseCase, OrderUseCase, RaffleUseCase};

#[derive(Debug, serde::Deserialize)]
struct JsonRpcRequest {
    #[serde(default = "default_jsonrpc")]
    jsonrpc: String,
    method: String,
    params: Option<Value>,
    id: Option<Value>,
}

fn default_jsonrpc() -> String {
    "2.0".to_string()
}

#[derive(Debug, serde::Serialize)]
struct JsonRpcResponse {
    jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
    id: Option<Value>,
}

#[derive(Debug, serde::Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

#[derive(Debug, serde::Serialize)]
struct Tool {
    name: String,
    description: String,
    #[serde(rename = "inputSchema")]
    input_schema: Value,
}

pub struct MCPHandler {
    raffle_use_case: Arc<RaffleUseCase>,
    order_use_case: Arc<OrderUseCase>,
    messaging_use_case: Arc<MessagingUseCase>,
}

impl MCPHandler {
    pub fn new(
        raffle_use_case: Arc<RaffleUseCase>,
        order_use_case: Arc<OrderUseCase>,
        messaging_use_case: Arc<MessagingUseCase>,
    ) -> Self {
        Self {
            raffle_use_case,
            order_use_case,
            messaging_use_case,
        }
    }

    pub async fn serve<R, W>(self, reader: R, mut writer: W) -> Result<()>
    where
        R: BufRead,
        W: Write,
    {
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let request: JsonRpcRequest = match serde_json::from_str::<JsonRpcRequest>(&line) {
                Ok(req) => req,
                Err(e) => {
                    warn!("Failed to parse request: {} - Line: {}", e, line);
                    let error_response = JsonRpcResponse {
                        jsonrpc: "2.0".to_string(),
                        result: None,
                        error: Some(JsonRpcError {
                            code: -32700,
                            message: "Parse error".to_string(),
                            data: Some(json!(e.to_string())),
                        }),
                        id: None,
                    };
                    let response_json = serde_json::to_string(&error_response)?;
                    writeln!(writer, "{}", response_json)?;
                    writer.flush()?;
                    continue;
                }
            };

            // Notifications carry no id and get no response.
            let is_notification =
                request.id.is_none() || request.method.starts_with("notifications/");

            if is_notification {
                if request.method == "notifications/initialized" {
                    info!("Client initialized");
                }
                continue;
            }

            let response = self.handle_request(request).await;
            let response_json = serde_json::to_string(&response)?;
            writeln!(writer, "{}", response_json)?;
            writer.flush()?;
        }

        Ok(())
    }

    async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        match request.method.as_str() {
            "initialize" => self.handle_initialize(request.id).await,
            "tools/list" => self.handle_list_tools(request.id).await,
            "tools/call" => self.handle_call_tool(request.params, request.id).await,
            _ => JsonRpcResponse {
                jsonrpc: "2.0".to_string(),
                result: None,
                error: Some(JsonRpcError {
                    code: -32601,
                    message: format!("Method not found: {}", request.method),
                    data: None,
                }),
                id: Some(request.id.unwrap_or(json!(1))),
            },
        }
    }

    async fn handle_initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        info!("Initializing rifa MCP server");
        JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            result: Some(json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {
                    "tools": {}
                },
                "serverInfo": {
                    "name": "rifa-mcp-server",
                    "version": "0.1.0"
                }
            })),
            error: None,
            id: Some(id.unwrap_or(json!(1))),
        }
    }

    async fn handle_list_tools(&self, id: Option<Value>) -> JsonRpcResponse {
        let tools = self.get_tools();
        JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            result: Some(json!({ "tools": tools })),
            error: None,
            id: Some(id.unwrap_or(json!(1))),
        }
    }

    async fn handle_call_tool(&self, params: Option<Value>, id: Option<Value>) -> JsonRpcResponse {
        let params = match params {
            Some(p) => p,
            None => {
                return JsonRpcResponse {
                    jsonrpc: "2.0".to_string(),
                    result: None,
                    error: Some(JsonRpcError {
                        code: -32602,
                        message: "Missing params".to_string(),
                        data: None,
                    }),
                    id: Some(id.unwrap_or(json!(1))),
                };
            }
        };

        let tool_name = match params.get("name").and_then(|n| n.as_str()) {
            Some(name) => name,
            None => {
                return JsonRpcResponse {
                    jsonrpc: "2.0".to_string(),
                    result: None,
                    error: Some(JsonRpcError {
                        code: -32602,
                        message: "Missing tool name".to_string(),
                        data: None,
                    }),
                    id: Some(id.unwrap_or(json!(1))),
                };
            }
        };

        let arguments = params.get("arguments").cloned().unwrap_or(json!({}));
        let arguments_map: HashMap<String, Value> =
            serde_json::from_value(arguments).unwrap_or_default();

        let result = self.execute_tool(tool_name, &arguments_map).await;

        match result {
            Ok(content) => JsonRpcResponse {
                jsonrpc: "2.0".to_string(),
                result: Some(json!({
                    "content": [
                        {
                            "type": "text",
                            "text": content
                        }
                    ]
                })),
                error: None,
                id: Some(id.unwrap_or(json!(1))),
            },
            Err(e) => JsonRpcResponse {
                jsonrpc: "2.0".to_string(),
                result: None,
                error: Some(JsonRpcError {
                    code: -32603,
                    message: format!("Tool execution error: {}", e),
                    data: None,
                }),
                id: Some(id.unwrap_or(json!(1))),
            },
        }
    }

    async fn execute_tool(
        &self,
        tool_name: &str,
        arguments: &HashMap<String, Value>,
    ) -> Result<String> {
        match tool_name {
            "create_raffle" => self.raffle_use_case.create_raffle(arguments).await,
            "list_raffles" => self.raffle_use_case.list_raffles(arguments).await,
            "select_raffle" => self.raffle_use_case.select_raffle(arguments).await,
            "get_raffle" => self.raffle_use_case.get_raffle(arguments).await,
            "edit_raffle" => self.raffle_use_case.edit_raffle(arguments).await,
            "delete_raffle" => self.raffle_use_case.delete_raffle(arguments).await,
            "get_raffle_stats" => self.raffle_use_case.get_raffle_stats(arguments).await,
            "reserve_tickets" => self.raffle_use_case.reserve_tickets(arguments).await,
            "mark_tickets_paid" => self.raffle_use_case.mark_tickets_paid(arguments).await,
            "release_tickets" => self.raffle_use_case.release_tickets(arguments).await,
            "bulk_update_status" => self.raffle_use_case.bulk_update_status(arguments).await,
            "find_related_tickets" => self.raffle_use_case.find_related_tickets(arguments).await,
            "list_orders" => self.order_use_case.list_orders(arguments).await,
            "export_raffle_grid" => self.order_use_case.export_raffle_grid(arguments).await,
            "reprint_receipt" => self.order_use_case.reprint_receipt(arguments).await,
            "compose_whatsapp_message" => {
                self.messaging_use_case
                    .compose_whatsapp_message(arguments)
                    .await
            }
            _ => Err(anyhow::anyhow!("Unknown tool: {}", tool_name)),
        }
    }

    fn get_tools(&self) -> Vec<Tool> {
        vec![
            Tool {
                name: "create_raffle".to_string(),
                description: "Create a raffle with its ticket grid and chance numbers".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "title": {
                            "type": "string",
                            "description": "Raffle title"
                        },
                        "prizes": {
                            "type": "string",
                            "description": "Prize description"
                        },
                        "cost": {
                            "type": "integer",
                            "description": "Ticket cost in whole currency units"
                        },
                        "quantity": {
                            "type": "integer",
                            "description": "Number of tickets (25, 33 or 50)"
                        },
                        "mode": {
                            "type": "string",
                            "enum": ["linear", "random"],
                            "description": "Chance number assignment mode (default linear)"
                        },
                        "theme": {
                            "type": "string",
                            "description": "Optional hex theme color"
                        }
                    },
                    "required": ["title", "cost", "quantity"]
                }),
            },
            Tool {
                name: "list_raffles".to_string(),
                description: "List every raffle with its occupancy summary".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {}
                }),
            },
            Tool {
                name: "select_raffle".to_string(),
                description: "Make a raffle the active one and return it".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "raffle_index": {
                            "type": "integer",
                            "description": "Position of the raffle in the collection"
                        }
                    },
                    "required": ["raffle_index"]
                }),
            },
            Tool {
                name: "get_raffle".to_string(),
                description: "Return a raffle with all its tickets".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "raffle_index": {
                            "type": "integer",
                            "description": "Position of the raffle in the collection"
                        }
                    },
                    "required": ["raffle_index"]
                }),
            },
            Tool {
                name: "edit_raffle".to_string(),
                description: "Edit a raffle's title, prizes, cost or theme (tickets are immutable)"
                    .to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "raffle_index": {
                            "type": "integer",
                            "description": "Position of the raffle in the collection"
                        },
                        "title": {
                            "type": "string",
                            "description": "New title"
                        },
                        "prizes": {
                            "type": "string",
                            "description": "New prize description"
                        },
                        "cost": {
                            "type": "integer",
                            "description": "New ticket cost"
                        },
                        "theme": {
                            "type": "string",
                            "description": "New hex theme color"
                        }
                    },
                    "required": ["raffle_index", "title", "cost"]
                }),
            },
            Tool {
                name: "delete_raffle".to_string(),
                description: "Delete a raffle permanently".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "raffle_index": {
                            "type": "integer",
                            "description": "Position of the raffle in the collection"
                        }
                    },
                    "required": ["raffle_index"]
                }),
            },
            Tool {
                name: "get_raffle_stats".to_string(),
                description: "Available/reserved/paid counts for a raffle".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "raffle_index": {
                            "type": "integer",
                            "description": "Position of the raffle in the collection"
                        }
                    },
                    "required": ["raffle_index"]
                }),
            },
            Tool {
                name: "reserve_tickets".to_string(),
                description: "Reserve tickets for a client and emit the pending receipt"
                    .to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "raffle_index": {
                            "type": "integer",
                            "description": "Position of the raffle in the collection"
                        },
                        "tickets": {
                            "type": "array",
                            "items": {"type": "integer"},
                            "description": "Zero-based ticket indices"
                        },
                        "client": {
                            "type": "string",
                            "description": "Client name (required)"
                        },
                        "phone": {
                            "type": "string",
                            "description": "Client phone"
                        }
                    },
                    "required": ["raffle_index", "tickets", "client"]
                }),
            },
            Tool {
                name: "mark_tickets_paid".to_string(),
                description: "Mark tickets paid and emit the paid receipt. Mixed-client selections need confirm_mixed; clientless selections need a client name (counter sale)".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "raffle_index": {
                            "type": "integer",
                            "description": "Position of the raffle in the collection"
                        },
                        "tickets": {
                            "type": "array",
                            "items": {"type": "integer"},
                            "description": "Zero-based ticket indices"
                        },
                        "client": {
                            "type": "string",
                            "description": "Fallback client name for counter sales"
                        },
                        "confirm_mixed": {
                            "type": "boolean",
                            "description": "Proceed even when the selection spans several clients"
                        },
                        "skip_related_check": {
                            "type": "boolean",
                            "description": "Proceed without the same-client cascade scan"
                        }
                    },
                    "required": ["raffle_index", "tickets"]
                }),
            },
            Tool {
                name: "release_tickets".to_string(),
                description: "Release tickets back to available, clearing the client".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "raffle_index": {
                            "type": "integer",
                            "description": "Position of the raffle in the collection"
                        },
                        "tickets": {
                            "type": "array",
                            "items": {"type": "integer"},
                            "description": "Zero-based ticket indices"
                        },
                        "skip_related_check": {
                            "type": "boolean",
                            "description": "Proceed without the same-client cascade scan"
                        }
                    },
                    "required": ["raffle_index", "tickets"]
                }),
            },
            Tool {
                name: "bulk_update_status".to_string(),
                description: "Force a status on a ticket selection (generic path, also demotes paid tickets)".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "raffle_index": {
                            "type": "integer",
                            "description": "Position of the raffle in the collection"
                        },
                        "tickets": {
                            "type": "array",
                            "items": {"type": "integer"},
                            "description": "Zero-based ticket indices"
                        },
                        "status": {
                            "type": "string",
                            "enum": ["available", "reserved", "paid"],
                            "description": "Target status"
                        }
                    },
                    "required": ["raffle_index", "tickets", "status"]
                }),
            },
            Tool {
                name: "find_related_tickets".to_string(),
                description: "List tickets outside the selection held by the same client (name or phone match)".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "raffle_index": {
                            "type": "integer",
                            "description": "Position of the raffle in the collection"
                        },
                        "tickets": {
                            "type": "array",
                            "items": {"type": "integer"},
                            "description": "Zero-based ticket indices"
                        }
                    },
                    "required": ["raffle_index", "tickets"]
                }),
            },
            Tool {
                name: "list_orders".to_string(),
                description: "Participants grouped by client with totals, pending groups first"
                    .to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "raffle_index": {
                            "type": "integer",
                            "description": "Position of the raffle in the collection"
                        },
                        "pending_only": {
                            "type": "boolean",
                            "description": "Only groups with reserved tickets"
                        }
                    },
                    "required": ["raffle_index"]
                }),
            },
            Tool {
                name: "export_raffle_grid".to_string(),
                description: "Render the whole ticket grid as a shareable report".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "raffle_index": {
                            "type": "integer",
                            "description": "Position of the raffle in the collection"
                        }
                    },
                    "required": ["raffle_index"]
                }),
            },
            Tool {
                name: "reprint_receipt".to_string(),
                description: "Rebuild and save a client's receipt by name and phone".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "raffle_index": {
                            "type": "integer",
                            "description": "Position of the raffle in the collection"
                        },
                        "client": {
                            "type": "string",
                            "description": "Client name (match is case/space insensitive)"
                        },
                        "phone": {
                            "type": "string",
                            "description": "Client phone"
                        }
                    },
                    "required": ["raffle_index", "client"]
                }),
            },
            Tool {
                name: "compose_whatsapp_message".to_string(),
                description: "Compose a payment reminder or thank-you WhatsApp message with its deep link".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "raffle_index": {
                            "type": "integer",
                            "description": "Position of the raffle in the collection"
                        },
                        "client": {
                            "type": "string",
                            "description": "Client name"
                        },
                        "phone": {
                            "type": "string",
                            "description": "Client phone"
                        },
                        "intent": {
                            "type": "string",
                            "enum": ["payment-reminder", "payment-thanks"],
                            "description": "Message template to use"
                        }
                    },
                    "required": ["raffle_index", "client", "intent"]
                }),
            },
        ]
    }
}

pub fn stdio() -> (BufReader<io::Stdin>, io::Stdout) {
    (BufReader::new(io::stdin()), io::stdout())
}
