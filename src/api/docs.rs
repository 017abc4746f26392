//! OpenAPI document served at `/api-docs`

use axum::response::Json;
use serde_json::{json, Value};

pub async fn api_docs() -> Json<Value> {
    Json(openapi_document())
}

pub fn openapi_document() -> Value {
    let bearer = json!([{ "bearerAuth": [] }]);
    let id_param = json!([{
        "name": "id",
        "in": "path",
        "required": true,
        "schema": { "type": "string", "format": "uuid" }
    }]);

    json!({
        "openapi": "3.0.0",
        "info": {
            "title": "Vaccine Booking API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Hospital directory and vaccination appointment booking"
        },
        "servers": [{ "url": "/api/v1" }],
        "components": {
            "securitySchemes": {
                "bearerAuth": { "type": "http", "scheme": "bearer", "bearerFormat": "JWT" }
            },
            "schemas": {
                "Hospital": {
                    "type": "object",
                    "required": ["name", "address"],
                    "properties": {
                        "id": { "type": "string", "format": "uuid" },
                        "ลําดับ": { "type": "string" },
                        "name": { "type": "string", "maxLength": 50 },
                        "address": { "type": "string" },
                        "district": { "type": "string" },
                        "province": { "type": "string" },
                        "postalcode": { "type": "string", "maxLength": 5 },
                        "tel": { "type": "string" },
                        "region": { "type": "string" },
                        "capacity": { "type": "integer", "minimum": 0 }
                    }
                },
                "Appointment": {
                    "type": "object",
                    "required": ["apptDate"],
                    "properties": {
                        "id": { "type": "string", "format": "uuid" },
                        "apptDate": { "type": "string", "format": "date-time" },
                        "user": { "type": "string", "format": "uuid" },
                        "hospital": { "type": "string", "format": "uuid" }
                    }
                },
                "Register": {
                    "type": "object",
                    "required": ["name", "email", "password"],
                    "properties": {
                        "name": { "type": "string" },
                        "email": { "type": "string", "format": "email" },
                        "tel": { "type": "string" },
                        "password": { "type": "string" }
                    }
                }
            }
        },
        "paths": {
            "/hospitals": {
                "get": { "tags": ["Hospitals"], "summary": "List all hospitals" },
                "post": {
                    "tags": ["Hospitals"],
                    "summary": "Create a hospital (admin)",
                    "security": bearer,
                    "requestBody": { "$ref": "#/components/schemas/Hospital" }
                }
            },
            "/hospitals/vacCenters": {
                "get": { "tags": ["Hospitals"], "summary": "List vaccination centers" }
            },
            "/hospitals/{id}": {
                "get": {
                    "tags": ["Hospitals"],
                    "summary": "Get a hospital",
                    "parameters": id_param
                },
                "put": {
                    "tags": ["Hospitals"],
                    "summary": "Update a hospital (admin)",
                    "security": bearer,
                    "parameters": id_param
                },
                "delete": {
                    "tags": ["Hospitals"],
                    "summary": "Delete a hospital and its appointments (admin)",
                    "security": bearer,
                    "parameters": id_param
                }
            },
            "/hospitals/{id}/appointments": {
                "get": {
                    "tags": ["Appointments"],
                    "summary": "List appointments at a hospital",
                    "security": bearer,
                    "parameters": id_param
                },
                "post": {
                    "tags": ["Appointments"],
                    "summary": "Book an appointment at a hospital",
                    "security": bearer,
                    "parameters": id_param
                }
            },
            "/appointments": {
                "get": {
                    "tags": ["Appointments"],
                    "summary": "List appointments (own, or all for admins)",
                    "security": bearer
                },
                "post": {
                    "tags": ["Appointments"],
                    "summary": "Book an appointment",
                    "security": bearer,
                    "requestBody": { "$ref": "#/components/schemas/Appointment" }
                }
            },
            "/appointments/{id}": {
                "get": {
                    "tags": ["Appointments"],
                    "summary": "Get an appointment",
                    "security": bearer,
                    "parameters": id_param
                },
                "put": {
                    "tags": ["Appointments"],
                    "summary": "Update an appointment",
                    "security": bearer,
                    "parameters": id_param
                },
                "delete": {
                    "tags": ["Appointments"],
                    "summary": "Cancel an appointment",
                    "security": bearer,
                    "parameters": id_param
                }
            },
            "/auth/register": {
                "post": {
                    "tags": ["Auth"],
                    "summary": "Register a user account",
                    "requestBody": { "$ref": "#/components/schemas/Register" }
                }
            },
            "/auth/login": {
                "post": { "tags": ["Auth"], "summary": "Log in with email and password" }
            },
            "/auth/logout": {
                "get": { "tags": ["Auth"], "summary": "Clear the session cookie" }
            },
            "/auth/me": {
                "get": {
                    "tags": ["Auth"],
                    "summary": "Current user profile",
                    "security": bearer
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_every_route() {
        let doc = openapi_document();
        let paths = doc["paths"].as_object().unwrap();

        for path in [
            "/hospitals",
            "/hospitals/vacCenters",
            "/hospitals/{id}",
            "/hospitals/{id}/appointments",
            "/appointments",
            "/appointments/{id}",
            "/auth/register",
            "/auth/login",
            "/auth/logout",
            "/auth/me",
        ] {
            assert!(paths.contains_key(path), "missing {}", path);
        }
        assert!(paths["/hospitals"]["get"].get("security").is_none());
        assert!(paths["/hospitals"]["post"].get("security").is_some());
    }
}
